//! # 晶体晶格模型
//!
//! 由六个晶胞参数计算实空间与倒易空间基矢，施加取向，
//! 并生成每个 φ 步、每个镶嵌块的旋转基矢。
//!
//! ## 算法概述
//! 1. 三斜晶胞体积 `V = 2abc·sqrt(|sin ā·sin(ā−α)·sin(ā−β)·sin(ā−γ)|)`，ā = (α+β+γ)/2
//! 2. 默认取向下构造倒易基矢（a* 沿 x，b* 在 xy 平面）
//! 3. 可选：取向矩阵替换倒易基矢；misset 旋转
//! 4. 实空间基矢 `a = (b*×c*)·V`，再由实空间基矢重新求倒易基矢，保证 `a_i·a*_j = δ_ij`
//! 5. 每个 φ 步绕转轴旋转（Rodrigues），再左乘镶嵌块旋转矩阵
//!
//! 晶体对象构造后不可变；插值开关状态除外（见 `structure_factor.rs`）。
//!
//! ## 依赖关系
//! - 被 `simulator/` 和 `commands/` 使用
//! - 使用 `physics/vector.rs`、`physics/random.rs`
//! - 持有 `models/structure_factor.rs` 的 StructureFactors

use crate::error::{Result, SimError};
use crate::models::config::{CrystalConfig, Misset};
use crate::models::structure_factor::{HklTable, StructureFactors};
use crate::physics::random::{mosaic_rotation_umat, umat_to_misset, CLcg};
use crate::physics::units::mm_to_angstrom;
use crate::physics::vector::{
    cross, dot, magnitude, mat_vec, rotate_axis, rotation_matrix_xyz, scale, Mat3, Vec3,
    IDENTITY,
};

use std::f64::consts::FRAC_PI_2;

/// 晶胞偏斜项下限
const SKEW_FLOOR: f64 = 1e-12;
/// 体积下限 (Å³)
const VOLUME_FLOOR: f64 = 1e-6;
/// 正弦下限
const SIN_FLOOR: f64 = 1e-12;

/// 晶胞张量：体积、倒易参数与两组基矢
#[derive(Debug, Clone)]
pub struct CellTensors {
    /// 晶胞体积 (Å³)
    pub volume: f64,
    /// 倒易晶胞体积 (Å⁻³)
    pub volume_star: f64,
    /// 倒易基矢长度 (Å⁻¹)
    pub reciprocal_lengths: Vec3,
    /// 倒易晶胞角 (度)
    pub reciprocal_angles: Vec3,
    /// 实际晶胞参数 (Å, 度)，取向矩阵输入时由基矢重算
    pub cell: [f64; 6],
    /// 实空间基矢 a, b, c (Å)
    pub real: [Vec3; 3],
    /// 倒易基矢 a*, b*, c* (Å⁻¹)
    pub reciprocal: [Vec3; 3],
}

/// 按 φ 步和镶嵌块展开的旋转基矢
#[derive(Debug, Clone)]
pub struct RotatedLattice {
    pub phi_steps: usize,
    pub mosaic_domains: usize,
    /// 下标 `phi * mosaic_domains + mos`
    pub real: Vec<[Vec3; 3]>,
    pub reciprocal: Vec<[Vec3; 3]>,
}

impl RotatedLattice {
    /// φ 步 × 镶嵌块总数
    pub fn len(&self) -> usize {
        self.real.len()
    }

    pub fn is_empty(&self) -> bool {
        self.real.is_empty()
    }
}

/// 计算晶胞张量
pub fn compute_cell_tensors(config: &CrystalConfig) -> Result<CellTensors> {
    let (a, b, c) = (config.cell_a, config.cell_b, config.cell_c);
    let (alpha, beta, gamma) = (
        config.cell_alpha.to_radians(),
        config.cell_beta.to_radians(),
        config.cell_gamma.to_radians(),
    );

    if config.orientation.is_none() {
        validate_cell(config)?;
    }

    let reciprocal = match &config.orientation {
        Some(matrix) => *matrix,
        None => default_reciprocal(a, b, c, alpha, beta, gamma),
    };

    // misset 作用于倒易基矢
    let reciprocal = match misset_angles(config) {
        Some([rx, ry, rz]) => {
            let r = rotation_matrix_xyz(rx, ry, rz);
            reciprocal.map(|v| mat_vec(&r, &v))
        }
        None => reciprocal,
    };

    let [a_star, b_star, c_star] = reciprocal;
    let b_cross_c = cross(&b_star, &c_star);
    let c_cross_a = cross(&c_star, &a_star);
    let a_cross_b = cross(&a_star, &b_star);

    let real = if config.orientation.is_some() {
        let v_star = dot(&a_star, &b_cross_c);
        if v_star.abs() < 1e-18 {
            return Err(SimError::ConfigurationError(
                "orientation matrix is singular".to_string(),
            ));
        }
        let v = 1.0 / v_star;
        [scale(&b_cross_c, v), scale(&c_cross_a, v), scale(&a_cross_b, v)]
    } else {
        // 叉积方向 + 配置长度
        [
            rescale(&b_cross_c, a),
            rescale(&c_cross_a, b),
            rescale(&a_cross_b, c),
        ]
    };

    // 由实空间基矢重新求倒易基矢
    let [ra, rb, rc] = real;
    let volume = dot(&ra, &cross(&rb, &rc));
    if volume.abs() < VOLUME_FLOOR {
        return Err(SimError::ConfigurationError(format!(
            "cell volume {:.3e} Å³ is degenerate",
            volume
        )));
    }
    let reciprocal = [
        scale(&cross(&rb, &rc), 1.0 / volume),
        scale(&cross(&rc, &ra), 1.0 / volume),
        scale(&cross(&ra, &rb), 1.0 / volume),
    ];

    let cell = cell_parameters(&real);
    let reciprocal_angles = [
        angle_between(&reciprocal[1], &reciprocal[2]),
        angle_between(&reciprocal[0], &reciprocal[2]),
        angle_between(&reciprocal[0], &reciprocal[1]),
    ];

    Ok(CellTensors {
        volume: volume.abs(),
        volume_star: 1.0 / volume.abs(),
        reciprocal_lengths: reciprocal.map(|v| magnitude(&v)),
        reciprocal_angles,
        cell,
        real,
        reciprocal,
    })
}

/// 晶胞参数合法性检查
fn validate_cell(config: &CrystalConfig) -> Result<()> {
    for (name, len) in [
        ("a", config.cell_a),
        ("b", config.cell_b),
        ("c", config.cell_c),
    ] {
        if !(len > 0.0) || !len.is_finite() {
            return Err(SimError::ConfigurationError(format!(
                "cell length {} must be positive, got {}",
                name, len
            )));
        }
    }
    for (name, ang) in [
        ("alpha", config.cell_alpha),
        ("beta", config.cell_beta),
        ("gamma", config.cell_gamma),
    ] {
        if !(ang > 0.0 && ang < 180.0) {
            return Err(SimError::ConfigurationError(format!(
                "cell angle {} must lie in (0, 180) degrees, got {}",
                name, ang
            )));
        }
    }

    let (alpha, beta, gamma) = (
        config.cell_alpha.to_radians(),
        config.cell_beta.to_radians(),
        config.cell_gamma.to_radians(),
    );
    let mean = (alpha + beta + gamma) / 2.0;
    let skew = mean.sin() * (mean - alpha).sin() * (mean - beta).sin() * (mean - gamma).sin();
    if skew <= 0.0 {
        return Err(SimError::ConfigurationError(format!(
            "cell angles {}/{}/{} do not form a valid cell",
            config.cell_alpha, config.cell_beta, config.cell_gamma
        )));
    }
    Ok(())
}

/// 默认取向下的倒易基矢
fn default_reciprocal(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> [Vec3; 3] {
    let (sin_a, cos_a) = alpha.sin_cos();
    let (sin_b, cos_b) = beta.sin_cos();
    let (sin_g, cos_g) = gamma.sin_cos();

    let mean = (alpha + beta + gamma) / 2.0;
    let skew = (mean.sin() * (mean - alpha).sin() * (mean - beta).sin() * (mean - gamma).sin())
        .abs()
        .max(SKEW_FLOOR);
    let volume = (2.0 * a * b * c * skew.sqrt()).max(VOLUME_FLOOR);
    let v_star = 1.0 / volume;

    let a_star = b * c * sin_a * v_star;
    let b_star = c * a * sin_b * v_star;
    let c_star = a * b * sin_g * v_star;

    let cos_alpha_star = (cos_b * cos_g - cos_a) / (sin_b * sin_g).max(SIN_FLOOR);
    let cos_beta_star = (cos_g * cos_a - cos_b) / (sin_g * sin_a).max(SIN_FLOOR);
    let cos_gamma_star = (cos_a * cos_b - cos_g) / (sin_a * sin_b).max(SIN_FLOOR);
    let sin_gamma_star = (1.0 - cos_gamma_star.clamp(-1.0, 1.0).powi(2))
        .max(SIN_FLOOR)
        .sqrt();

    [
        [a_star, 0.0, 0.0],
        [b_star * cos_gamma_star, b_star * sin_gamma_star, 0.0],
        // 实空间 c 垂直于 a*、b*，即沿 z 轴，由 c*·c = 1 得 z 分量
        [
            c_star * cos_beta_star,
            c_star * (cos_alpha_star - cos_beta_star * cos_gamma_star) / sin_gamma_star,
            1.0 / c,
        ],
    ]
}

/// 将向量缩放到指定长度
fn rescale(v: &Vec3, length: f64) -> Vec3 {
    let m = magnitude(v).max(SIN_FLOOR);
    scale(v, length / m)
}

/// 两向量夹角（度）
fn angle_between(u: &Vec3, v: &Vec3) -> f64 {
    let denom = (magnitude(u) * magnitude(v)).max(SIN_FLOOR);
    (dot(u, v) / denom).clamp(-1.0, 1.0).acos().to_degrees()
}

/// 由实空间基矢求晶胞参数
fn cell_parameters(real: &[Vec3; 3]) -> [f64; 6] {
    let [a, b, c] = real;
    [
        magnitude(a),
        magnitude(b),
        magnitude(c),
        angle_between(b, c),
        angle_between(a, c),
        angle_between(a, b),
    ]
}

/// 解析 misset 角（弧度）
fn misset_angles(config: &CrystalConfig) -> Option<[f64; 3]> {
    match config.misset? {
        Misset::Angles(deg) => Some(deg.map(f64::to_radians)),
        Misset::Random => {
            let mut rng = CLcg::new(config.misset_seed);
            let umat = mosaic_rotation_umat(FRAC_PI_2, &mut rng);
            Some(umat_to_misset(&umat))
        }
    }
}

/// 晶体模型
#[derive(Debug, Clone)]
pub struct Crystal {
    config: CrystalConfig,
    tensors: CellTensors,
    cells: Vec3,
    structure: StructureFactors,
    mosaic_umats: Vec<Mat3>,
}

impl Crystal {
    /// 构造晶体；配置错误在此返回
    pub fn new(config: CrystalConfig, table: Option<HklTable>) -> Result<Self> {
        if config.phi_steps == 0 {
            return Err(SimError::ConfigurationError(
                "phi_steps must be at least 1".to_string(),
            ));
        }
        if config.mosaic_domains == 0 {
            return Err(SimError::ConfigurationError(
                "mosaic_domains must be at least 1".to_string(),
            ));
        }
        if config.mosaic_spread_deg < 0.0 {
            return Err(SimError::ConfigurationError(
                "mosaic spread must be non-negative".to_string(),
            ));
        }
        if !(config.fudge > 0.0) {
            return Err(SimError::ConfigurationError(
                "fudge factor must be positive".to_string(),
            ));
        }

        let tensors = compute_cell_tensors(&config)?;

        let cells = match config.crystal_size_mm {
            Some(size) => {
                let mut n = [0.0; 3];
                for i in 0..3 {
                    let len = magnitude(&tensors.real[i]);
                    n[i] = (mm_to_angstrom(size[i]) / len).ceil().max(1.0);
                }
                n
            }
            None => {
                if config.n_cells.iter().any(|&n| n == 0) {
                    return Err(SimError::ConfigurationError(
                        "number of unit cells must be at least 1 along each axis".to_string(),
                    ));
                }
                config.n_cells.map(|n| n as f64)
            }
        };

        // 晶胞数过少时最近整数形状因子不可靠，自动开启插值
        let interpolate = config
            .interpolate
            .unwrap_or_else(|| cells.iter().any(|&n| n <= 2.0));
        let structure = StructureFactors::new(table, config.default_f, interpolate);

        let mosaic_umats = if config.mosaic_spread_deg > 0.0 {
            let mut rng = CLcg::new(config.mosaic_seed);
            let spread = config.mosaic_spread_deg.to_radians();
            (0..config.mosaic_domains)
                .map(|_| mosaic_rotation_umat(spread, &mut rng))
                .collect()
        } else {
            vec![IDENTITY; config.mosaic_domains as usize]
        };

        Ok(Self {
            config,
            tensors,
            cells,
            structure,
            mosaic_umats,
        })
    }

    pub fn config(&self) -> &CrystalConfig {
        &self.config
    }

    pub fn tensors(&self) -> &CellTensors {
        &self.tensors
    }

    /// 实空间基矢 a, b, c
    pub fn real_vectors(&self) -> &[Vec3; 3] {
        &self.tensors.real
    }

    /// 倒易基矢 a*, b*, c*
    pub fn reciprocal_vectors(&self) -> &[Vec3; 3] {
        &self.tensors.reciprocal
    }

    /// 各方向晶胞数 (Na, Nb, Nc)
    pub fn cells(&self) -> Vec3 {
        self.cells
    }

    pub fn structure_factors(&self) -> &StructureFactors {
        &self.structure
    }

    pub fn mosaic_umats(&self) -> &[Mat3] {
        &self.mosaic_umats
    }

    /// 查询结构因子
    pub fn get_structure_factor(&self, h: f64, k: f64, l: f64) -> f64 {
        self.structure.get_structure_factor(h, k, l)
    }

    /// 第 i 个 φ 步的角度（弧度）
    pub fn phi_angle(&self, step: usize) -> f64 {
        let phi_step = self.config.osc_range_deg / self.config.phi_steps as f64;
        (self.config.phi_start_deg + phi_step * step as f64).to_radians()
    }

    /// 生成每个 φ 步、每个镶嵌块的旋转基矢
    pub fn get_rotated_real_vectors(&self, spindle_axis: &Vec3) -> RotatedLattice {
        let phi_steps = self.config.phi_steps as usize;
        let mosaic_domains = self.mosaic_umats.len();
        let mut real = Vec::with_capacity(phi_steps * mosaic_domains);
        let mut reciprocal = Vec::with_capacity(phi_steps * mosaic_domains);

        for step in 0..phi_steps {
            let phi = self.phi_angle(step);
            let real_phi = self.tensors.real.map(|v| rotate_axis(&v, spindle_axis, phi));
            let recip_phi = self
                .tensors
                .reciprocal
                .map(|v| rotate_axis(&v, spindle_axis, phi));

            for umat in &self.mosaic_umats {
                real.push(real_phi.map(|v| mat_vec(umat, &v)));
                reciprocal.push(recip_phi.map(|v| mat_vec(umat, &v)));
            }
        }

        RotatedLattice {
            phi_steps,
            mosaic_domains,
            real,
            reciprocal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn cell(a: f64, b: f64, c: f64, al: f64, be: f64, ga: f64) -> CrystalConfig {
        CrystalConfig {
            cell_a: a,
            cell_b: b,
            cell_c: c,
            cell_alpha: al,
            cell_beta: be,
            cell_gamma: ga,
            ..CrystalConfig::default()
        }
    }

    fn assert_duality(t: &CellTensors) {
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert_abs_diff_eq!(dot(&t.real[i], &t.reciprocal[j]), expected, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_cubic_cell() {
        let t = compute_cell_tensors(&cell(100.0, 100.0, 100.0, 90.0, 90.0, 90.0)).unwrap();
        assert_abs_diff_eq!(t.volume, 1e6, epsilon = 1e-6);
        assert_abs_diff_eq!(t.reciprocal[0][0], 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(t.real[0][0], 100.0, epsilon = 1e-9);
        assert_duality(&t);
    }

    #[test]
    fn test_orthorhombic_duality_and_parallel() {
        for (a, b, c) in [(50.0, 60.0, 70.0), (12.3, 45.6, 78.9), (3.0, 200.0, 9.5)] {
            let t = compute_cell_tensors(&cell(a, b, c, 90.0, 90.0, 90.0)).unwrap();
            for i in 0..3 {
                assert_abs_diff_eq!(dot(&t.real[i], &t.reciprocal[i]), 1.0, epsilon = 1e-9);
                // 平行且长度互为倒数
                let cross_norm = magnitude(&cross(&t.real[i], &t.reciprocal[i]));
                assert!(cross_norm < 1e-9);
                assert_abs_diff_eq!(
                    magnitude(&t.real[i]) * magnitude(&t.reciprocal[i]),
                    1.0,
                    epsilon = 1e-9
                );
            }
        }
    }

    #[test]
    fn test_triclinic_duality() {
        for params in [
            (70.0, 80.0, 90.0, 75.0, 85.0, 95.0),
            (27.0, 31.0, 34.0, 88.0, 52.0, 103.0),
            (100.0, 100.0, 100.0, 60.0, 60.0, 60.0),
        ] {
            let t = compute_cell_tensors(&cell(
                params.0, params.1, params.2, params.3, params.4, params.5,
            ))
            .unwrap();
            assert_duality(&t);
            assert_abs_diff_eq!(t.cell[0], params.0, epsilon = 1e-9);
            assert_abs_diff_eq!(t.cell[4], params.4, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_hexagonal_volume() {
        let t = compute_cell_tensors(&cell(3.0, 3.0, 5.0, 90.0, 90.0, 120.0)).unwrap();
        let expected = 3.0 * 3.0 * 5.0 * (120f64.to_radians()).sin();
        assert_abs_diff_eq!(t.volume, expected, epsilon = 1e-9);
    }

    #[test]
    fn test_invalid_cells_rejected() {
        assert!(compute_cell_tensors(&cell(-1.0, 10.0, 10.0, 90.0, 90.0, 90.0)).is_err());
        assert!(compute_cell_tensors(&cell(10.0, 10.0, 10.0, 0.0, 90.0, 90.0)).is_err());
        // α > β + γ 无法构成晶胞
        assert!(compute_cell_tensors(&cell(10.0, 10.0, 10.0, 170.0, 40.0, 40.0)).is_err());
    }

    #[test]
    fn test_misset_rotates_both_bases() {
        let mut cfg = cell(50.0, 60.0, 70.0, 90.0, 90.0, 90.0);
        cfg.misset = Some(Misset::Angles([10.0, 20.0, 30.0]));
        let t = compute_cell_tensors(&cfg).unwrap();
        assert_duality(&t);
        assert_abs_diff_eq!(magnitude(&t.real[1]), 60.0, epsilon = 1e-9);
        assert!(t.real[0][1].abs() > 1e-3);
    }

    #[test]
    fn test_random_misset_is_reproducible() {
        let mut cfg = cell(50.0, 60.0, 70.0, 90.0, 90.0, 90.0);
        cfg.misset = Some(Misset::Random);
        cfg.misset_seed = 99;
        let a = compute_cell_tensors(&cfg).unwrap();
        let b = compute_cell_tensors(&cfg).unwrap();
        assert_eq!(a.real, b.real);
        assert_duality(&a);
    }

    #[test]
    fn test_orientation_matrix_input() {
        let mut cfg = CrystalConfig::default();
        cfg.orientation = Some([[0.02, 0.0, 0.0], [0.0, 0.025, 0.0], [0.0, 0.0, 0.05]]);
        let t = compute_cell_tensors(&cfg).unwrap();
        assert_abs_diff_eq!(t.cell[0], 50.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.cell[1], 40.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.cell[2], 20.0, epsilon = 1e-9);
        assert_duality(&t);
    }

    #[test]
    fn test_crystal_size_sets_cell_counts() {
        let mut cfg = cell(100.0, 100.0, 100.0, 90.0, 90.0, 90.0);
        // 0.001049 mm = 10490 Å -> ceil(104.9) = 105 个晶胞
        cfg.crystal_size_mm = Some([0.001049, 0.000095, 0.000149]);
        let crystal = Crystal::new(cfg, None).unwrap();
        assert_eq!(crystal.cells(), [105.0, 10.0, 15.0]);
    }

    #[test]
    fn test_interpolation_auto_enable() {
        let table = HklTable::from_reflections(&[(0, 0, 0, 1.0), (5, 5, 5, 1.0)], 0.0).unwrap();
        let mut cfg = CrystalConfig::default();
        cfg.n_cells = [2, 10, 10];
        let small = Crystal::new(cfg.clone(), Some(table.clone())).unwrap();
        assert!(small.structure_factors().interpolation_enabled());

        cfg.n_cells = [10, 10, 10];
        let large = Crystal::new(cfg.clone(), Some(table.clone())).unwrap();
        assert!(!large.structure_factors().interpolation_enabled());

        cfg.interpolate = Some(true);
        let forced = Crystal::new(cfg, Some(table)).unwrap();
        assert!(forced.structure_factors().interpolation_enabled());
    }

    #[test]
    fn test_rotated_lattice_shape_and_phi() {
        let mut cfg = CrystalConfig::default();
        cfg.phi_steps = 4;
        cfg.osc_range_deg = 90.0;
        cfg.mosaic_domains = 3;
        cfg.mosaic_spread_deg = 0.5;
        let crystal = Crystal::new(cfg, None).unwrap();
        let lattice = crystal.get_rotated_real_vectors(&[0.0, 0.0, 1.0]);

        assert_eq!(lattice.len(), 12);
        assert_eq!((lattice.phi_steps, lattice.mosaic_domains), (4, 3));

        // 第 2 步 φ = 45°
        assert_abs_diff_eq!(crystal.phi_angle(2), 45f64.to_radians(), epsilon = 1e-12);

        // 旋转后对偶关系保持
        for (real, recip) in lattice.real.iter().zip(&lattice.reciprocal) {
            for i in 0..3 {
                for j in 0..3 {
                    let expected = if i == j { 1.0 } else { 0.0 };
                    assert_abs_diff_eq!(dot(&real[i], &recip[j]), expected, epsilon = 1e-9);
                }
            }
        }
    }

    #[test]
    fn test_mosaic_is_seeded() {
        let mut cfg = CrystalConfig::default();
        cfg.mosaic_domains = 5;
        cfg.mosaic_spread_deg = 1.0;
        let a = Crystal::new(cfg.clone(), None).unwrap();
        let b = Crystal::new(cfg.clone(), None).unwrap();
        assert_eq!(a.mosaic_umats(), b.mosaic_umats());

        cfg.mosaic_seed = 777;
        let c = Crystal::new(cfg, None).unwrap();
        assert_ne!(a.mosaic_umats(), c.mosaic_umats());
    }
}
