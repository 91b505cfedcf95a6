//! # 探测器几何模型
//!
//! 在选定约定下计算快轴/慢轴/法向基矢、原点像素位置、像素网格、
//! 立体角、倾斜因子和传感层吸收。
//!
//! ## 算法概述
//! 1. 约定给出初始基矢、光束方向、偏振轴、转轴、2θ 轴和光束中心偏移规则
//! 2. 初始基矢经 Gram-Schmidt 正交化：保留 f，s 对 f 正交化，o 取与给定 o 同侧的 ±f×s
//!    基矢依次绕 X、Y、Z 旋转，再绕 2θ 轴旋转，最后重新单位化
//! 3. BEAM 枢轴：用旋转后的基矢计算 `pix0 = −Fbeam·f − Sbeam·s + distance·beam`
//! 4. SAMPLE 枢轴：用初始基矢计算 `pix0 = −Fclose·f − Sclose·s + close_distance·o`，再经同一旋转链
//! 5. 像素位置 `pix0 + Fdet·f + Sdet·s`，像素中心位于 `(i + ½)·pixel`
//!
//! 内部长度单位为 Å。
//!
//! ## 依赖关系
//! - 被 `simulator/`、`sampling/`、`commands/` 使用
//! - 使用 `models/config.rs` 的 DetectorConfig
//! - 使用 `sampling/auto_select.rs` 决定厚度分层

use crate::error::{Result, SimError};
use crate::models::config::{DetectorConfig, DetectorConvention, DetectorPivot};
use crate::physics::units::{angstrom_to_m, mm_to_angstrom, um_to_angstrom};
use crate::physics::vector::{
    add, cross, dot, magnitude, mat_vec, rotate_axis, rotation_matrix_xyz, scale, sub, unitize,
    Vec3,
};
use crate::sampling::{auto_select, ParameterKind, SamplingRequest};

use ndarray::Array2;

/// 快轴与慢轴夹角正弦低于此值视为平行
const PARALLEL_TOLERANCE: f64 = 1e-6;

/// 保留 f 的方向，s 对 f 正交化，o 取 ±f×s 中与给定 o 同侧者
fn orthonormal_basis(fdet: &Vec3, sdet: &Vec3, odet: &Vec3) -> Result<[Vec3; 3]> {
    let (f, f_len) = unitize(fdet);
    let (s_unit, s_len) = unitize(sdet);
    if f_len < PARALLEL_TOLERANCE || s_len < PARALLEL_TOLERANCE {
        return Err(SimError::ConfigurationError(
            "detector fast and slow vectors must be non-zero".to_string(),
        ));
    }
    let (s, sine) = unitize(&sub(&s_unit, &scale(&f, dot(&s_unit, &f))));
    if sine < PARALLEL_TOLERANCE {
        return Err(SimError::ConfigurationError(
            "detector fast and slow vectors are parallel".to_string(),
        ));
    }
    let normal = cross(&f, &s);
    let o = if dot(&normal, odet) < 0.0 {
        scale(&normal, -1.0)
    } else {
        normal
    };
    Ok([f, s, o])
}

/// 视差下限
const PARALLAX_FLOOR: f64 = 1e-12;

/// 约定的初始向量组
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConventionVectors {
    pub fdet: Vec3,
    pub sdet: Vec3,
    pub odet: Vec3,
    pub beam: Vec3,
    pub polarization: Vec3,
    pub spindle: Vec3,
    pub twotheta_axis: Vec3,
}

impl DetectorConvention {
    /// 约定的初始向量
    pub fn vectors(self) -> ConventionVectors {
        match self {
            DetectorConvention::Mosflm | DetectorConvention::Denzo | DetectorConvention::Custom => {
                ConventionVectors {
                    fdet: [0.0, 0.0, 1.0],
                    sdet: [0.0, -1.0, 0.0],
                    odet: [1.0, 0.0, 0.0],
                    beam: [1.0, 0.0, 0.0],
                    polarization: [0.0, 0.0, 1.0],
                    spindle: [0.0, 0.0, 1.0],
                    twotheta_axis: [0.0, 0.0, -1.0],
                }
            }
            DetectorConvention::Xds => ConventionVectors {
                fdet: [1.0, 0.0, 0.0],
                sdet: [0.0, 1.0, 0.0],
                odet: [0.0, 0.0, 1.0],
                beam: [0.0, 0.0, 1.0],
                polarization: [1.0, 0.0, 0.0],
                spindle: [1.0, 0.0, 0.0],
                twotheta_axis: [1.0, 0.0, 0.0],
            },
            DetectorConvention::Dials => ConventionVectors {
                fdet: [1.0, 0.0, 0.0],
                sdet: [0.0, 1.0, 0.0],
                odet: [0.0, 0.0, 1.0],
                beam: [0.0, 0.0, 1.0],
                polarization: [0.0, 1.0, 0.0],
                spindle: [0.0, 1.0, 0.0],
                twotheta_axis: [0.0, 1.0, 0.0],
            },
            DetectorConvention::Adxv => ConventionVectors {
                fdet: [1.0, 0.0, 0.0],
                sdet: [0.0, -1.0, 0.0],
                odet: [0.0, 0.0, 1.0],
                beam: [0.0, 0.0, 1.0],
                polarization: [1.0, 0.0, 0.0],
                spindle: [1.0, 0.0, 0.0],
                twotheta_axis: [-1.0, 0.0, 0.0],
            },
        }
    }

    /// 约定的默认枢轴
    pub fn default_pivot(self) -> DetectorPivot {
        match self {
            DetectorConvention::Xds | DetectorConvention::Dials => DetectorPivot::Sample,
            _ => DetectorPivot::Beam,
        }
    }

    /// 光束中心 (慢轴, 快轴) mm 映射为 (Sbeam, Fbeam) Å
    pub fn beam_offsets(self, center_s_mm: f64, center_f_mm: f64, pixel_mm: f64, size_s_mm: f64) -> (f64, f64) {
        let (s, f) = match self {
            DetectorConvention::Mosflm => (center_s_mm + 0.5 * pixel_mm, center_f_mm + 0.5 * pixel_mm),
            DetectorConvention::Adxv => (
                size_s_mm - center_s_mm - 0.5 * pixel_mm,
                center_f_mm + 0.5 * pixel_mm,
            ),
            _ => (center_s_mm, center_f_mm),
        };
        (mm_to_angstrom(s), mm_to_angstrom(f))
    }
}

/// 探测器模型
#[derive(Debug, Clone)]
pub struct Detector {
    config: DetectorConfig,
    convention: DetectorConvention,
    pivot: DetectorPivot,
    defaults: ConventionVectors,

    fdet: Vec3,
    sdet: Vec3,
    odet: Vec3,
    beam: Vec3,
    pix0: Vec3,
    close_distance: f64,

    /// 像素尺寸 (Å)
    pixel_size: f64,
    /// 传感层厚度与衰减长度 (Å)
    thickness: f64,
    attenuation_length: f64,
    thick_layers: u32,
}

impl Detector {
    /// 构造探测器；配置错误在此返回
    pub fn new(config: DetectorConfig) -> Result<Self> {
        if config.spixels == 0 || config.fpixels == 0 {
            return Err(SimError::ConfigurationError(
                "detector must have at least one pixel along each axis".to_string(),
            ));
        }
        if !(config.pixel_size_mm > 0.0) {
            return Err(SimError::ConfigurationError(
                "pixel size must be positive".to_string(),
            ));
        }
        if config.oversample == 0 {
            return Err(SimError::ConfigurationError(
                "oversample must be at least 1".to_string(),
            ));
        }
        if config.pix0_vector_mm.is_none() && !(config.distance_mm > 0.0) {
            return Err(SimError::ConfigurationError(
                "detector distance must be positive".to_string(),
            ));
        }
        if config.thickness_um < 0.0 || !(config.attenuation_length_um > 0.0) {
            return Err(SimError::ConfigurationError(
                "detector thickness must be non-negative and attenuation length positive"
                    .to_string(),
            ));
        }

        let convention = if config.has_custom_vectors() {
            DetectorConvention::Custom
        } else {
            config.convention
        };
        let pivot = config.pivot.unwrap_or_else(|| convention.default_pivot());

        let defaults = config.convention.vectors();
        let [fdet0, sdet0, odet0] = orthonormal_basis(
            &config.fdet_vector.unwrap_or(defaults.fdet),
            &config.sdet_vector.unwrap_or(defaults.sdet),
            &config.odet_vector.unwrap_or(defaults.odet),
        )?;
        let beam = unitize(&config.beam_vector.unwrap_or(defaults.beam)).0;
        let twotheta_axis = config.twotheta_axis.unwrap_or(defaults.twotheta_axis);

        let rotation = rotation_matrix_xyz(
            config.rotx_deg.to_radians(),
            config.roty_deg.to_radians(),
            config.rotz_deg.to_radians(),
        );
        let twotheta = config.twotheta_deg.to_radians();
        let rotate = |v: &Vec3| rotate_axis(&mat_vec(&rotation, v), &twotheta_axis, twotheta);

        let fdet = unitize(&rotate(&fdet0)).0;
        let sdet = unitize(&rotate(&sdet0)).0;
        let odet = unitize(&rotate(&odet0)).0;

        let size_s_mm = config.spixels as f64 * config.pixel_size_mm;
        let (sbeam, fbeam) = convention.beam_offsets(
            config.beam_center_s_mm,
            config.beam_center_f_mm,
            config.pixel_size_mm,
            size_s_mm,
        );
        let distance = mm_to_angstrom(config.distance_mm);

        let pix0 = match config.pix0_vector_mm {
            Some(p) => p.map(mm_to_angstrom),
            None => match pivot {
                DetectorPivot::Beam => add(
                    &add(&scale(&fdet, -fbeam), &scale(&sdet, -sbeam)),
                    &scale(&beam, distance),
                ),
                DetectorPivot::Sample => {
                    let (sclose, fclose) = match config.close_center_mm {
                        Some((s, f)) => convention.beam_offsets(s, f, config.pixel_size_mm, size_s_mm),
                        None => (sbeam, fbeam),
                    };
                    let close = config.close_distance_mm.map(mm_to_angstrom).unwrap_or(distance);
                    let unrotated = add(
                        &add(&scale(&fdet0, -fclose), &scale(&sdet0, -sclose)),
                        &scale(&odet0, close),
                    );
                    rotate(&unrotated)
                }
            },
        };

        let close_distance = dot(&pix0, &odet);

        let thickness = um_to_angstrom(config.thickness_um);
        let thick_layers = if thickness > 0.0 {
            let plan = auto_select(
                &SamplingRequest {
                    count: config.thick_steps,
                    range: Some(config.thickness_um * 1e-6),
                    step: None,
                },
                ParameterKind::Thickness,
            )?;
            plan.count.max(1)
        } else {
            1
        };

        Ok(Self {
            pixel_size: mm_to_angstrom(config.pixel_size_mm),
            attenuation_length: um_to_angstrom(config.attenuation_length_um),
            thickness,
            thick_layers,
            convention,
            pivot,
            defaults,
            fdet,
            sdet,
            odet,
            beam,
            pix0,
            close_distance,
            config,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn convention(&self) -> DetectorConvention {
        self.convention
    }

    pub fn pivot(&self) -> DetectorPivot {
        self.pivot
    }

    /// 约定默认向量（转轴、偏振轴等）
    pub fn convention_vectors(&self) -> &ConventionVectors {
        &self.defaults
    }

    /// (慢轴, 快轴) 像素数
    pub fn shape(&self) -> (usize, usize) {
        (self.config.spixels, self.config.fpixels)
    }

    pub fn fdet(&self) -> Vec3 {
        self.fdet
    }

    pub fn sdet(&self) -> Vec3 {
        self.sdet
    }

    pub fn odet(&self) -> Vec3 {
        self.odet
    }

    /// 光束传播方向（单位向量）
    pub fn beam_vector(&self) -> Vec3 {
        self.beam
    }

    /// 原点像素位置 (Å)
    pub fn pix0_vector(&self) -> Vec3 {
        self.pix0
    }

    /// 样品到探测器平面的垂直距离 (Å)，带符号
    pub fn close_distance(&self) -> f64 {
        self.close_distance
    }

    /// 像素尺寸 (Å)
    pub fn pixel_size(&self) -> f64 {
        self.pixel_size
    }

    pub fn oversample(&self) -> u32 {
        self.config.oversample
    }

    pub fn thick_layers(&self) -> u32 {
        self.thick_layers
    }

    /// 光束中心在探测器平面上的位置 (Sbeam, Fbeam)，单位 mm
    pub fn beam_center_mm(&self) -> (f64, f64) {
        let (s, f) = self.convention.beam_offsets(
            self.config.beam_center_s_mm,
            self.config.beam_center_f_mm,
            self.config.pixel_size_mm,
            self.config.spixels as f64 * self.config.pixel_size_mm,
        );
        (s * 1e-7, f * 1e-7)
    }

    /// 子像素中心位置 (Å)
    pub fn subpixel_position(&self, slow: usize, fast: usize, sub_s: u32, sub_f: u32) -> Vec3 {
        let os = self.config.oversample as f64;
        let sub = self.pixel_size / os;
        let fdet = sub * ((fast as f64) * os + sub_f as f64 + 0.5);
        let sdet = sub * ((slow as f64) * os + sub_s as f64 + 0.5);
        add(&self.pix0, &add(&scale(&self.fdet, fdet), &scale(&self.sdet, sdet)))
    }

    /// 像素中心位置 (Å)
    pub fn pixel_position(&self, slow: usize, fast: usize) -> Vec3 {
        let fdet = self.pixel_size * (fast as f64 + 0.5);
        let sdet = self.pixel_size * (slow as f64 + 0.5);
        add(&self.pix0, &add(&scale(&self.fdet, fdet), &scale(&self.sdet, sdet)))
    }

    /// 全部像素中心位置，形状 (slow, fast)
    pub fn pixel_coords(&self) -> Array2<Vec3> {
        let (ns, nf) = self.shape();
        Array2::from_shape_fn((ns, nf), |(s, f)| self.pixel_position(s, f))
    }

    /// 像素立体角
    pub fn solid_angle(&self, position: &Vec3) -> f64 {
        let r = magnitude(position).max(crate::physics::vector::MAGNITUDE_FLOOR);
        if self.config.point_pixel {
            let r_m = angstrom_to_m(r);
            1.0 / (r_m * r_m)
        } else {
            self.pixel_size * self.pixel_size * self.close_distance / (r * r * r)
        }
    }

    /// 倾斜因子 close_distance / R
    pub fn obliquity(&self, position: &Vec3) -> f64 {
        let r = magnitude(position).max(crate::physics::vector::MAGNITUDE_FLOOR);
        self.close_distance / r
    }

    /// 全部像素立体角，形状 (slow, fast)
    pub fn solid_angle_map(&self) -> Array2<f64> {
        let (ns, nf) = self.shape();
        Array2::from_shape_fn((ns, nf), |(s, f)| self.solid_angle(&self.pixel_position(s, f)))
    }

    /// 传感层吸收比例
    ///
    /// 对每一层求 `exp(−t·Δ/(μ⁻¹·p)) − exp(−(t+1)·Δ/(μ⁻¹·p))` 并求和，
    /// p 为衍射方向与法向的视差。无厚度时为 1。
    pub fn capture_fraction(&self, diffracted_unit: &Vec3) -> f64 {
        if self.thickness <= 0.0 {
            return 1.0;
        }
        let parallax = dot(diffracted_unit, &self.odet).abs().max(PARALLAX_FLOOR);
        let layer = self.thickness / self.thick_layers as f64;
        let depth = self.attenuation_length * parallax;

        (0..self.thick_layers)
            .map(|t| {
                let t = t as f64;
                (-t * layer / depth).exp() - (-(t + 1.0) * layer / depth).exp()
            })
            .sum()
    }

    /// 全部像素吸收比例，以像素中心方向计算
    pub fn capture_fraction_map(&self) -> Array2<f64> {
        let (ns, nf) = self.shape();
        Array2::from_shape_fn((ns, nf), |(s, f)| {
            let (d, _) = unitize(&self.pixel_position(s, f));
            self.capture_fraction(&d)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const ALL_CONVENTIONS: [DetectorConvention; 6] = [
        DetectorConvention::Mosflm,
        DetectorConvention::Xds,
        DetectorConvention::Denzo,
        DetectorConvention::Dials,
        DetectorConvention::Adxv,
        DetectorConvention::Custom,
    ];

    fn assert_orthonormal(d: &Detector) {
        let (f, s, o) = (d.fdet(), d.sdet(), d.odet());
        for v in [f, s, o] {
            assert_abs_diff_eq!(magnitude(&v), 1.0, epsilon = 1e-9);
        }
        assert_abs_diff_eq!(dot(&f, &s), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dot(&f, &o), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(dot(&s, &o), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_basis_orthonormal_all_conventions_and_rotations() {
        for convention in ALL_CONVENTIONS {
            for pivot in [DetectorPivot::Beam, DetectorPivot::Sample] {
                for (rx, ry, rz, tt) in [(0.0, 0.0, 0.0, 0.0), (5.0, 3.0, 2.0, 15.0), (-20.0, 45.0, 90.0, 30.0)] {
                    let cfg = DetectorConfig {
                        convention,
                        pivot: Some(pivot),
                        rotx_deg: rx,
                        roty_deg: ry,
                        rotz_deg: rz,
                        twotheta_deg: tt,
                        ..DetectorConfig::default()
                    };
                    assert_orthonormal(&Detector::new(cfg).unwrap());
                }
            }
        }
    }

    #[test]
    fn test_mosflm_beam_center_pixel() {
        // 默认 MOSFLM：光束中心 51.2 mm + ½ 像素落在像素 (512, 512) 中心
        let d = Detector::new(DetectorConfig::default()).unwrap();
        let p = d.pixel_position(512, 512);
        assert_abs_diff_eq!(p[0], 1e9, epsilon = 1e-3);
        assert_abs_diff_eq!(p[1], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(p[2], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(d.close_distance(), 1e9, epsilon = 1e-3);
    }

    #[test]
    fn test_xds_origin() {
        let cfg = DetectorConfig {
            convention: DetectorConvention::Xds,
            pivot: Some(DetectorPivot::Beam),
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        let pix0 = d.pix0_vector();
        assert_abs_diff_eq!(pix0[0], -5.12e8, epsilon = 1e-3);
        assert_abs_diff_eq!(pix0[1], -5.12e8, epsilon = 1e-3);
        assert_abs_diff_eq!(pix0[2], 1e9, epsilon = 1e-3);
    }

    #[test]
    fn test_pivots_agree_without_rotation() {
        for convention in ALL_CONVENTIONS {
            let beam = Detector::new(DetectorConfig {
                convention,
                pivot: Some(DetectorPivot::Beam),
                ..DetectorConfig::default()
            })
            .unwrap();
            let sample = Detector::new(DetectorConfig {
                convention,
                pivot: Some(DetectorPivot::Sample),
                ..DetectorConfig::default()
            })
            .unwrap();
            for i in 0..3 {
                assert_abs_diff_eq!(beam.pix0_vector()[i], sample.pix0_vector()[i], epsilon = 1e-3);
            }
        }
    }

    #[test]
    fn test_beam_pivot_keeps_beam_center_fixed() {
        let cfg = DetectorConfig {
            pivot: Some(DetectorPivot::Beam),
            rotx_deg: 5.0,
            roty_deg: 3.0,
            rotz_deg: 2.0,
            twotheta_deg: 15.0,
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        // 光束中心点 = pix0 + Fbeam·f + Sbeam·s 仍在光束上 distance 处
        let (sbeam, fbeam) = d.beam_center_mm();
        let center = add(
            &d.pix0_vector(),
            &add(&scale(&d.fdet(), mm_to_angstrom(fbeam)), &scale(&d.sdet(), mm_to_angstrom(sbeam))),
        );
        assert_abs_diff_eq!(center[0], 1e9, epsilon = 1e-2);
        assert_abs_diff_eq!(center[1], 0.0, epsilon = 1e-2);
        assert_abs_diff_eq!(center[2], 0.0, epsilon = 1e-2);
    }

    #[test]
    fn test_sample_pivot_keeps_close_distance() {
        let cfg = DetectorConfig {
            pivot: Some(DetectorPivot::Sample),
            rotx_deg: 5.0,
            roty_deg: 3.0,
            rotz_deg: 2.0,
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        assert_abs_diff_eq!(d.close_distance(), 1e9, epsilon = 1e-2);
    }

    #[test]
    fn test_solid_angle_and_obliquity_at_center() {
        let d = Detector::new(DetectorConfig::default()).unwrap();
        let p = d.pixel_position(512, 512);
        // (0.1 mm)² / (100 mm)²
        assert_abs_diff_eq!(d.solid_angle(&p), 1e-6, epsilon = 1e-15);
        assert_abs_diff_eq!(d.obliquity(&p), 1.0, epsilon = 1e-12);

        let corner = d.pixel_position(0, 0);
        assert!(d.solid_angle(&corner) < d.solid_angle(&p));
        assert!(d.obliquity(&corner) < 1.0);
    }

    #[test]
    fn test_pixel_coords_grid() {
        let cfg = DetectorConfig {
            spixels: 4,
            fpixels: 6,
            ..DetectorConfig::default()
        }
        .centered();
        let d = Detector::new(cfg).unwrap();
        let grid = d.pixel_coords();
        assert_eq!(grid.dim(), (4, 6));
        let step = sub_vec(&grid[[0, 1]], &grid[[0, 0]]);
        assert_abs_diff_eq!(magnitude(&step), 1e6, epsilon = 1e-6);
    }

    fn sub_vec(a: &Vec3, b: &Vec3) -> Vec3 {
        crate::physics::vector::sub(a, b)
    }

    #[test]
    fn test_subpixels_average_to_center() {
        let cfg = DetectorConfig {
            oversample: 3,
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        let mut sum = [0.0; 3];
        for ss in 0..3 {
            for sf in 0..3 {
                sum = add(&sum, &d.subpixel_position(10, 20, ss, sf));
            }
        }
        let mean = scale(&sum, 1.0 / 9.0);
        let center = d.pixel_position(10, 20);
        for i in 0..3 {
            assert_abs_diff_eq!(mean[i], center[i], epsilon = 1e-3);
        }
    }

    #[test]
    fn test_capture_fraction() {
        let d = Detector::new(DetectorConfig::default()).unwrap();
        assert_eq!(d.capture_fraction(&[1.0, 0.0, 0.0]), 1.0);

        let cfg = DetectorConfig {
            thickness_um: 100.0,
            attenuation_length_um: 234.0,
            thick_steps: Some(4),
            ..DetectorConfig::default()
        };
        let thick = Detector::new(cfg).unwrap();
        let normal = thick.capture_fraction(&[1.0, 0.0, 0.0]);
        assert_abs_diff_eq!(normal, 1.0 - (-100.0f64 / 234.0).exp(), epsilon = 1e-12);

        // 斜入射路径更长，吸收更多
        let (oblique, _) = unitize(&[1.0, 0.5, 0.0]);
        assert!(thick.capture_fraction(&oblique) > normal);
    }

    #[test]
    fn test_custom_vectors_switch_convention() {
        let cfg = DetectorConfig {
            fdet_vector: Some([0.0, 1.0, 0.0]),
            sdet_vector: Some([0.0, 0.0, 1.0]),
            odet_vector: Some([1.0, 0.0, 0.0]),
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        assert_eq!(d.convention(), DetectorConvention::Custom);
        assert_orthonormal(&d);
    }

    #[test]
    fn test_non_orthogonal_custom_vectors_orthonormalized() {
        let cfg = DetectorConfig {
            fdet_vector: Some([0.0, 0.0, 2.0]),
            sdet_vector: Some([0.1, -1.0, 0.3]),
            odet_vector: Some([1.0, 0.2, 0.05]),
            ..DetectorConfig::default()
        };
        let d = Detector::new(cfg).unwrap();
        let (f, s, o) = (d.fdet(), d.sdet(), d.odet());
        assert!(dot(&f, &s).abs() < 1e-12);
        assert!(dot(&f, &o).abs() < 1e-12);
        assert!(dot(&s, &o).abs() < 1e-12);
        // 快轴方向保持不变
        assert!(dot(&f, &[0.0, 0.0, 1.0]) > 1.0 - 1e-12);
        assert!(s[1] < 0.0);
        assert!(o[0] > 0.0);
        assert_orthonormal(&d);
    }

    #[test]
    fn test_left_handed_normal_keeps_given_side() {
        let [f, s, o] = orthonormal_basis(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0], &[0.0, 0.0, -1.0]).unwrap();
        assert_eq!(f, [1.0, 0.0, 0.0]);
        assert_eq!(s, [0.0, 1.0, 0.0]);
        assert_eq!(o, [0.0, 0.0, -1.0]);
    }

    #[test]
    fn test_parallel_custom_vectors_rejected() {
        let cfg = DetectorConfig {
            fdet_vector: Some([0.0, 0.0, 1.0]),
            sdet_vector: Some([0.0, 0.0, -3.0]),
            ..DetectorConfig::default()
        };
        assert!(Detector::new(cfg).is_err());
    }

    #[test]
    fn test_invalid_configs_rejected() {
        let zero_pixels = DetectorConfig {
            spixels: 0,
            ..DetectorConfig::default()
        };
        assert!(Detector::new(zero_pixels).is_err());

        let bad_oversample = DetectorConfig {
            oversample: 0,
            ..DetectorConfig::default()
        };
        assert!(Detector::new(bad_oversample).is_err());
    }
}
