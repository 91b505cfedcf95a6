//! # 模拟配置数据模型
//!
//! 晶体、探测器、光源三组配置结构，以及几何约定、枢轴、misset 等枚举。
//! 所有配置均为纯数据，带 `Default`，可序列化。
//!
//! 用户单位：晶胞 Å/度，探测器 mm，源距离 m，探测器厚度 µm，发散角弧度。
//!
//! ## 依赖关系
//! - 被 `models/crystal.rs`、`models/detector.rs`、`sampling/`、`simulator/` 使用
//! - 被 `commands/` 从命令行参数构造

use crate::physics::vector::Vec3;
use crate::sampling::SamplingRequest;

use serde::{Deserialize, Serialize};

pub use crate::physics::shape::CrystalShape;

// ─────────────────────────────────────────────────────────────
// 枚举
// ─────────────────────────────────────────────────────────────

/// 探测器几何约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DetectorConvention {
    #[default]
    Mosflm,
    Xds,
    Denzo,
    Dials,
    Adxv,
    Custom,
}

impl std::fmt::Display for DetectorConvention {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorConvention::Mosflm => write!(f, "MOSFLM"),
            DetectorConvention::Xds => write!(f, "XDS"),
            DetectorConvention::Denzo => write!(f, "DENZO"),
            DetectorConvention::Dials => write!(f, "DIALS"),
            DetectorConvention::Adxv => write!(f, "ADXV"),
            DetectorConvention::Custom => write!(f, "CUSTOM"),
        }
    }
}

/// 探测器旋转枢轴
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DetectorPivot {
    /// 绕光束中心像素旋转
    Beam,
    /// 绕样品位置旋转
    Sample,
}

impl std::fmt::Display for DetectorPivot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectorPivot::Beam => write!(f, "BEAM"),
            DetectorPivot::Sample => write!(f, "SAMPLE"),
        }
    }
}

/// 晶体 misset 设置
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Misset {
    /// 固定 XYZ 角（度）
    Angles([f64; 3]),
    /// 由 misset 种子生成随机取向
    Random,
}

// ─────────────────────────────────────────────────────────────
// 晶体配置
// ─────────────────────────────────────────────────────────────

/// 晶体配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrystalConfig {
    /// 晶胞参数 a, b, c (Å)
    pub cell_a: f64,
    pub cell_b: f64,
    pub cell_c: f64,
    /// 晶胞角 α, β, γ (度)
    pub cell_alpha: f64,
    pub cell_beta: f64,
    pub cell_gamma: f64,

    /// 各方向晶胞数 (Na, Nb, Nc)
    pub n_cells: [u32; 3],
    /// 晶体尺寸 (mm)，设置时覆盖 `n_cells`
    pub crystal_size_mm: Option<[f64; 3]>,
    /// 形状模型
    pub shape: CrystalShape,
    /// 形状因子缩放
    pub fudge: f64,

    /// misset 旋转
    pub misset: Option<Misset>,
    /// 随机 misset 的种子
    pub misset_seed: i64,
    /// 取向矩阵：倒易基矢 a*, b*, c* (Å⁻¹)
    pub orientation: Option<[Vec3; 3]>,

    /// 无结构因子表时使用的默认值
    pub default_f: f64,
    /// 强制开启/关闭三三次插值；None 表示按晶胞数自动决定
    pub interpolate: Option<bool>,

    /// 起始 φ 角 (度)
    pub phi_start_deg: f64,
    /// 振荡范围 (度)
    pub osc_range_deg: f64,
    /// φ 步数
    pub phi_steps: u32,
    /// 转轴；None 时使用探测器约定的默认转轴
    pub spindle_axis: Option<Vec3>,

    /// 镶嵌度 (度)
    pub mosaic_spread_deg: f64,
    /// 镶嵌块数
    pub mosaic_domains: u32,
    /// 镶嵌块随机种子
    pub mosaic_seed: i64,
}

impl Default for CrystalConfig {
    fn default() -> Self {
        Self {
            cell_a: 100.0,
            cell_b: 100.0,
            cell_c: 100.0,
            cell_alpha: 90.0,
            cell_beta: 90.0,
            cell_gamma: 90.0,
            n_cells: [5, 5, 5],
            crystal_size_mm: None,
            shape: CrystalShape::Square,
            fudge: 1.0,
            misset: None,
            misset_seed: 1,
            orientation: None,
            default_f: 0.0,
            interpolate: None,
            phi_start_deg: 0.0,
            osc_range_deg: 0.0,
            phi_steps: 1,
            spindle_axis: None,
            mosaic_spread_deg: 0.0,
            mosaic_domains: 1,
            mosaic_seed: -12345678,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 探测器配置
// ─────────────────────────────────────────────────────────────

/// 探测器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectorConfig {
    /// 慢轴像素数
    pub spixels: usize,
    /// 快轴像素数
    pub fpixels: usize,
    /// 像素尺寸 (mm)
    pub pixel_size_mm: f64,
    /// 样品到探测器距离 (mm)
    pub distance_mm: f64,
    /// SAMPLE 枢轴下的最近距离 (mm)；None 时等于 `distance_mm`
    pub close_distance_mm: Option<f64>,

    /// 光束中心 (慢轴, 快轴) (mm)
    pub beam_center_s_mm: f64,
    pub beam_center_f_mm: f64,
    /// SAMPLE 枢轴下的最近点 (慢轴, 快轴) (mm)
    pub close_center_mm: Option<(f64, f64)>,

    /// 探测器旋转角 (度)
    pub rotx_deg: f64,
    pub roty_deg: f64,
    pub rotz_deg: f64,
    pub twotheta_deg: f64,
    /// 2θ 旋转轴；None 时使用约定默认值
    pub twotheta_axis: Option<Vec3>,

    /// 几何约定
    pub convention: DetectorConvention,
    /// 枢轴；None 时按约定选择
    pub pivot: Option<DetectorPivot>,

    /// 自定义基矢
    pub fdet_vector: Option<Vec3>,
    pub sdet_vector: Option<Vec3>,
    pub odet_vector: Option<Vec3>,
    pub beam_vector: Option<Vec3>,
    /// 直接给定原点像素位置 (mm)
    pub pix0_vector_mm: Option<Vec3>,

    /// 子像素过采样倍数
    pub oversample: u32,
    /// 点像素模式（立体角 1/R²）
    pub point_pixel: bool,

    /// 传感层厚度 (µm)，0 表示不计吸收
    pub thickness_um: f64,
    /// 衰减长度 (µm)
    pub attenuation_length_um: f64,
    /// 厚度分层数
    pub thick_steps: Option<u32>,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            spixels: 1024,
            fpixels: 1024,
            pixel_size_mm: 0.1,
            distance_mm: 100.0,
            close_distance_mm: None,
            beam_center_s_mm: 51.2,
            beam_center_f_mm: 51.2,
            close_center_mm: None,
            rotx_deg: 0.0,
            roty_deg: 0.0,
            rotz_deg: 0.0,
            twotheta_deg: 0.0,
            twotheta_axis: None,
            convention: DetectorConvention::Mosflm,
            pivot: None,
            fdet_vector: None,
            sdet_vector: None,
            odet_vector: None,
            beam_vector: None,
            pix0_vector_mm: None,
            oversample: 1,
            point_pixel: false,
            thickness_um: 0.0,
            attenuation_length_um: 234.0,
            thick_steps: None,
        }
    }
}

impl DetectorConfig {
    /// 以探测器尺寸的一半作为光束中心
    pub fn centered(mut self) -> Self {
        self.beam_center_s_mm = self.spixels as f64 * self.pixel_size_mm / 2.0;
        self.beam_center_f_mm = self.fpixels as f64 * self.pixel_size_mm / 2.0;
        self
    }

    /// 是否给出了任一自定义向量
    pub fn has_custom_vectors(&self) -> bool {
        self.fdet_vector.is_some()
            || self.sdet_vector.is_some()
            || self.odet_vector.is_some()
            || self.beam_vector.is_some()
            || self.pix0_vector_mm.is_some()
    }
}

// ─────────────────────────────────────────────────────────────
// 光源配置
// ─────────────────────────────────────────────────────────────

/// 光源与光束配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BeamConfig {
    /// 中心波长 (Å)
    pub wavelength_a: f64,
    /// 通量密度 (photons/m²)
    pub fluence: f64,
    /// Kahn 偏振因子 (0-1)
    pub polarization_kahn: f64,
    /// 关闭偏振校正
    pub nopolar: bool,
    /// 偏振参考轴；None 时使用约定默认值
    pub polarization_axis: Option<Vec3>,
    /// 光源到样品距离 (m)
    pub source_distance_m: f64,

    /// 水平发散 (弧度)
    pub hdiv: SamplingRequest,
    /// 垂直发散 (弧度)
    pub vdiv: SamplingRequest,
    /// 色散（相对带宽）
    pub dispersion: SamplingRequest,
    /// 椭圆裁剪发散网格
    pub round_div: bool,
}

impl Default for BeamConfig {
    fn default() -> Self {
        Self {
            wavelength_a: 1.0,
            fluence: crate::physics::units::DEFAULT_FLUENCE,
            polarization_kahn: 0.0,
            nopolar: false,
            polarization_axis: None,
            source_distance_m: 10.0,
            hdiv: SamplingRequest::default(),
            vdiv: SamplingRequest::default(),
            dispersion: SamplingRequest::default(),
            round_div: true,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 模拟选项
// ─────────────────────────────────────────────────────────────

/// 模拟循环选项
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationOptions {
    /// 逐子像素计算立体角
    pub oversample_omega: bool,
    /// 逐子像素计算偏振
    pub oversample_polar: bool,
    /// 逐子像素计算吸收
    pub oversample_thick: bool,
    /// 分辨率截断 (Å)，0 表示关闭
    pub dmin_a: f64,
    /// 并行线程数，0 表示自动
    pub jobs: usize,
    /// 显示进度条
    pub show_progress: bool,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            oversample_omega: false,
            oversample_polar: false,
            oversample_thick: false,
            dmin_a: 0.0,
            jobs: 0,
            show_progress: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detector_default_center() {
        let cfg = DetectorConfig::default();
        let centered = cfg.clone().centered();
        assert!((centered.beam_center_s_mm - cfg.beam_center_s_mm).abs() < 1e-12);
        assert!((centered.beam_center_f_mm - 51.2).abs() < 1e-12);
    }

    #[test]
    fn test_custom_vector_detection() {
        let mut cfg = DetectorConfig::default();
        assert!(!cfg.has_custom_vectors());
        cfg.beam_vector = Some([0.0, 0.0, 1.0]);
        assert!(cfg.has_custom_vectors());
    }

    #[test]
    fn test_convention_display() {
        assert_eq!(DetectorConvention::Dials.to_string(), "DIALS");
        assert_eq!(DetectorPivot::Sample.to_string(), "SAMPLE");
        assert_eq!(CrystalShape::Gauss.to_string(), "gauss");
    }
}
