//! # 结构因子表与查询
//!
//! 结构因子以稠密三维数组存储，下标为 `(h−h_min, k−k_min, l−l_min)`。
//!
//! ## 功能
//! - 最近整数查表（越界返回默认值）
//! - 4×4×4 三三次插值
//! - 插值邻域首次越界时永久关闭插值，并只警告一次
//!
//! 插值开关属于每个 [`StructureFactors`] 实例。模拟器在并行计算前按像素顺序
//! 调用 [`StructureFactors::check_interpolation`]，越界时在此关闭插值，
//! 因此并行期间的查询不会再触发关闭，开关保持不变。
//!
//! ## 依赖关系
//! - 被 `models/crystal.rs` 持有
//! - 被 `io/hkl.rs` 构造
//! - 使用 `physics/interpolate.rs`

use crate::error::{Result, SimError};
use crate::physics::interpolate::polin3;
use crate::utils::output;

use ndarray::Array3;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// 最近整数 Miller 指数（半整数向下取）
pub fn nearest_miller(x: f64) -> f64 {
    (x - 0.5).ceil()
}

/// floor−1 ..= floor+2 在三个维度上都落在表内
fn neighbourhood_in_bounds(b: &HklBounds, h: f64, k: f64, l: f64) -> bool {
    let inside = |x: f64, lo: i32, hi: i32| {
        let f = x.floor() as i64;
        f - 1 >= lo as i64 && f + 2 <= hi as i64
    };
    inside(h, b.h_min, b.h_max) && inside(k, b.k_min, b.k_max) && inside(l, b.l_min, b.l_max)
}

/// 结构因子表的指数范围（闭区间）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HklBounds {
    pub h_min: i32,
    pub h_max: i32,
    pub k_min: i32,
    pub k_max: i32,
    pub l_min: i32,
    pub l_max: i32,
}

impl HklBounds {
    /// 各维格点数
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            (self.h_max - self.h_min + 1).max(0) as usize,
            (self.k_max - self.k_min + 1).max(0) as usize,
            (self.l_max - self.l_min + 1).max(0) as usize,
        )
    }

    /// 是否包含给定整数指数
    pub fn contains(&self, h: i64, k: i64, l: i64) -> bool {
        h >= self.h_min as i64
            && h <= self.h_max as i64
            && k >= self.k_min as i64
            && k <= self.k_max as i64
            && l >= self.l_min as i64
            && l <= self.l_max as i64
    }
}

/// 稠密结构因子表
#[derive(Debug, Clone)]
pub struct HklTable {
    bounds: HklBounds,
    data: Array3<f64>,
}

impl HklTable {
    /// 由范围和数据构造，检查形状一致
    pub fn new(bounds: HklBounds, data: Array3<f64>) -> Result<Self> {
        if bounds.h_max < bounds.h_min || bounds.k_max < bounds.k_min || bounds.l_max < bounds.l_min
        {
            return Err(SimError::ConfigurationError(format!(
                "HKL bounds are inverted: {:?}",
                bounds
            )));
        }
        if data.dim() != bounds.shape() {
            return Err(SimError::ConfigurationError(format!(
                "HKL grid shape {:?} does not match bounds {:?}",
                data.dim(),
                bounds
            )));
        }
        Ok(Self { bounds, data })
    }

    /// 由稀疏反射列表构造，未列出的格点填充 `fill`
    pub fn from_reflections(reflections: &[(i32, i32, i32, f64)], fill: f64) -> Result<Self> {
        let first = reflections.first().ok_or_else(|| {
            SimError::ConfigurationError("structure factor list is empty".to_string())
        })?;

        let mut bounds = HklBounds {
            h_min: first.0,
            h_max: first.0,
            k_min: first.1,
            k_max: first.1,
            l_min: first.2,
            l_max: first.2,
        };
        for &(h, k, l, _) in reflections {
            bounds.h_min = bounds.h_min.min(h);
            bounds.h_max = bounds.h_max.max(h);
            bounds.k_min = bounds.k_min.min(k);
            bounds.k_max = bounds.k_max.max(k);
            bounds.l_min = bounds.l_min.min(l);
            bounds.l_max = bounds.l_max.max(l);
        }

        let mut data = Array3::from_elem(bounds.shape(), fill);
        for &(h, k, l, f) in reflections {
            data[[
                (h - bounds.h_min) as usize,
                (k - bounds.k_min) as usize,
                (l - bounds.l_min) as usize,
            ]] = f;
        }

        Self::new(bounds, data)
    }

    /// 指数范围
    pub fn bounds(&self) -> HklBounds {
        self.bounds
    }

    /// 原始数据
    pub fn data(&self) -> &Array3<f64> {
        &self.data
    }

    /// 整数指数查表，越界返回 None
    pub fn get(&self, h: i64, k: i64, l: i64) -> Option<f64> {
        if !self.bounds.contains(h, k, l) {
            return None;
        }
        Some(
            self.data[[
                (h - self.bounds.h_min as i64) as usize,
                (k - self.bounds.k_min as i64) as usize,
                (l - self.bounds.l_min as i64) as usize,
            ]],
        )
    }

    /// 非零格点数
    pub fn populated(&self) -> usize {
        self.data.iter().filter(|f| **f != 0.0).count()
    }
}

/// 插值开关状态
#[derive(Debug)]
pub struct InterpolationState {
    enabled: AtomicBool,
    warned: AtomicBool,
}

impl InterpolationState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: AtomicBool::new(enabled),
            warned: AtomicBool::new(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// 永久关闭插值；只有第一次调用会打印警告
    fn disable(&self, h: f64, k: f64, l: f64) {
        self.enabled.store(false, Ordering::Relaxed);
        if !self.warned.swap(true, Ordering::Relaxed) {
            output::print_warning(&format!(
                "Out of range for tricubic interpolation at h,k,l = {:.3},{:.3},{:.3}; \
                 interpolation disabled for the rest of the run",
                h, k, l
            ));
        }
    }
}

impl Clone for InterpolationState {
    fn clone(&self) -> Self {
        Self {
            enabled: AtomicBool::new(self.is_enabled()),
            warned: AtomicBool::new(self.warned.load(Ordering::Relaxed)),
        }
    }
}

/// 结构因子查询器
#[derive(Debug, Clone)]
pub struct StructureFactors {
    table: Option<HklTable>,
    default_f: f64,
    interpolation: InterpolationState,
}

impl StructureFactors {
    /// 创建查询器；无表时插值无意义，强制关闭
    pub fn new(table: Option<HklTable>, default_f: f64, interpolate: bool) -> Self {
        let enabled = interpolate && table.is_some();
        Self {
            table,
            default_f,
            interpolation: InterpolationState::new(enabled),
        }
    }

    pub fn table(&self) -> Option<&HklTable> {
        self.table.as_ref()
    }

    pub fn default_f(&self) -> f64 {
        self.default_f
    }

    pub fn interpolation_enabled(&self) -> bool {
        self.interpolation.is_enabled()
    }

    /// 插值开启时检查 (h, k, l) 的 4×4×4 邻域，越界则永久关闭插值；
    /// 返回插值是否仍开启
    pub fn check_interpolation(&self, h: f64, k: f64, l: f64) -> bool {
        if !self.interpolation.is_enabled() {
            return false;
        }
        match &self.table {
            Some(table) if neighbourhood_in_bounds(&table.bounds(), h, k, l) => true,
            _ => {
                self.interpolation.disable(h, k, l);
                false
            }
        }
    }

    /// 查询分数指数处的结构因子
    pub fn get_structure_factor(&self, h: f64, k: f64, l: f64) -> f64 {
        let table = match &self.table {
            Some(t) => t,
            None => return self.default_f,
        };

        if self.interpolation.is_enabled() {
            return match self.tricubic(table, h, k, l) {
                Some(f) => f,
                None => {
                    self.interpolation.disable(h, k, l);
                    self.default_f
                }
            };
        }

        self.nearest(table, h, k, l)
    }

    /// 最近整数查表，越界返回默认值
    fn nearest(&self, table: &HklTable, h: f64, k: f64, l: f64) -> f64 {
        table
            .get(
                nearest_miller(h) as i64,
                nearest_miller(k) as i64,
                nearest_miller(l) as i64,
            )
            .unwrap_or(self.default_f)
    }

    /// 4×4×4 三三次插值；邻域越界返回 None
    fn tricubic(&self, table: &HklTable, h: f64, k: f64, l: f64) -> Option<f64> {
        if !neighbourhood_in_bounds(&table.bounds(), h, k, l) {
            return None;
        }
        let (hf, kf, lf) = (h.floor() as i64, k.floor() as i64, l.floor() as i64);

        let nodes = |base: i64| [-1, 0, 1, 2].map(|o| (base + o) as f64);
        let (h_nodes, k_nodes, l_nodes) = (nodes(hf), nodes(kf), nodes(lf));

        let mut sub = [[[0.0; 4]; 4]; 4];
        for (i, plane) in sub.iter_mut().enumerate() {
            for (j, row) in plane.iter_mut().enumerate() {
                for (m, cell) in row.iter_mut().enumerate() {
                    *cell = table.get(hf - 1 + i as i64, kf - 1 + j as i64, lf - 1 + m as i64)?;
                }
            }
        }

        Some(polin3(&h_nodes, &k_nodes, &l_nodes, &sub, h, k, l))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 指数 -3..=3 的立方表，F = 10 + h + 2k + 3l
    fn linear_table() -> HklTable {
        let mut refl = Vec::new();
        for h in -3..=3 {
            for k in -3..=3 {
                for l in -3..=3 {
                    refl.push((h, k, l, 10.0 + h as f64 + 2.0 * k as f64 + 3.0 * l as f64));
                }
            }
        }
        HklTable::from_reflections(&refl, 0.0).unwrap()
    }

    #[test]
    fn test_nearest_miller() {
        assert_eq!(nearest_miller(1.4), 1.0);
        assert_eq!(nearest_miller(1.6), 2.0);
        assert_eq!(nearest_miller(-0.4), 0.0);
        assert_eq!(nearest_miller(-1.6), -2.0);
    }

    #[test]
    fn test_from_reflections_bounds_and_fill() {
        let table = HklTable::from_reflections(&[(0, 0, 0, 5.0), (2, -1, 3, 7.0)], 1.5).unwrap();
        let b = table.bounds();
        assert_eq!((b.h_min, b.h_max, b.k_min, b.k_max, b.l_min, b.l_max), (0, 2, -1, 0, 0, 3));
        assert_eq!(table.get(2, -1, 3), Some(7.0));
        assert_eq!(table.get(1, 0, 1), Some(1.5));
        assert_eq!(table.get(3, 0, 0), None);
    }

    #[test]
    fn test_empty_reflections_rejected() {
        assert!(HklTable::from_reflections(&[], 0.0).is_err());
    }

    #[test]
    fn test_no_table_returns_default() {
        let sf = StructureFactors::new(None, 42.0, true);
        assert!(!sf.interpolation_enabled());
        assert_eq!(sf.get_structure_factor(1.3, 2.2, -0.4), 42.0);
    }

    #[test]
    fn test_nearest_lookup_and_out_of_range() {
        let sf = StructureFactors::new(Some(linear_table()), 7.0, false);
        assert_eq!(sf.get_structure_factor(1.2, 0.9, -0.1), 10.0 + 1.0 + 2.0);
        assert_eq!(sf.get_structure_factor(9.0, 0.0, 0.0), 7.0);
    }

    #[test]
    fn test_tricubic_reproduces_linear_field() {
        let sf = StructureFactors::new(Some(linear_table()), 0.0, true);
        let f = sf.get_structure_factor(0.3, -0.6, 0.25);
        assert!((f - (10.0 + 0.3 - 1.2 + 0.75)).abs() < 1e-10);
        assert!(sf.interpolation_enabled());
    }

    #[test]
    fn test_out_of_bounds_disables_permanently() {
        let sf = StructureFactors::new(Some(linear_table()), 3.25, true);

        // floor(2.5)+2 = 4 > h_max
        let f = sf.get_structure_factor(2.5, 0.0, 0.0);
        assert_eq!(f, 3.25);
        assert!(!sf.interpolation_enabled());

        // 之后回退到最近整数查表，即使邻域在界内
        let g = sf.get_structure_factor(0.3, 0.0, 0.0);
        assert_eq!(g, 10.0);
        assert!(!sf.interpolation_enabled());
    }

    #[test]
    fn test_in_bounds_check_leaves_lookup_untouched() {
        let sf = StructureFactors::new(Some(linear_table()), 3.25, true);
        assert!(sf.check_interpolation(0.3, 0.0, 0.0));
        let g = sf.get_structure_factor(0.3, 0.0, 0.0);
        assert!((g - 10.3).abs() < 1e-10);
        assert!(sf.interpolation_enabled());
    }

    #[test]
    fn test_out_of_bounds_check_disables_permanently() {
        let sf = StructureFactors::new(Some(linear_table()), 3.25, true);
        assert!(sf.check_interpolation(0.3, -0.6, 0.25));
        assert!(sf.interpolation_enabled());

        assert!(!sf.check_interpolation(2.5, 0.0, 0.0));
        assert!(!sf.interpolation_enabled());

        // 之后一律最近整数查表，即使邻域在界内
        assert!(!sf.check_interpolation(0.3, 0.0, 0.0));
        assert_eq!(sf.get_structure_factor(0.3, 0.0, 0.0), 10.0);
    }

    #[test]
    fn test_neighbourhood_bounds_edges() {
        let b = linear_table().bounds();
        // floor(-2.0)-1 = -3 在界内，floor(1.99)+2 = 3 在界内
        assert!(neighbourhood_in_bounds(&b, -2.0, 1.99, 0.0));
        assert!(!neighbourhood_in_bounds(&b, -2.01, 0.0, 0.0));
        assert!(!neighbourhood_in_bounds(&b, 0.0, 0.0, 2.0));
    }

    #[test]
    fn test_instances_do_not_share_state() {
        let a = StructureFactors::new(Some(linear_table()), 0.0, true);
        let b = StructureFactors::new(Some(linear_table()), 0.0, true);
        a.check_interpolation(2.9, 0.0, 0.0);
        assert!(!a.interpolation_enabled());
        assert!(b.interpolation_enabled());
    }

    #[test]
    fn test_check_without_interpolation_is_inert() {
        let sf = StructureFactors::new(None, 1.0, true);
        assert!(!sf.interpolation_enabled());
        assert!(!sf.check_interpolation(0.0, 0.0, 0.0));
    }
}
