//! # 晶格形状因子
//!
//! 有限尺寸晶体在 Bragg 峰附近的形状因子 `F_latt`。
//!
//! ## 算法概述
//! - SQUARE: 三个方向广义 sinc 之积 `Π sincg(π·Δi, Ni)`
//! - ROUND:  球形晶体，`N·0.723601254558268·sinc3(π·sqrt(fudge·hrad²))`
//! - GAUSS:  高斯近似，`N·exp(−hrad²·fudge/0.63)`
//! - TOPHAT: 截断球，`hrad²·fudge < 0.3969` 时为 `N`，否则 0
//!
//! 其中 `Δi` 为分数 Miller 指数与最近整数之差，`hrad² = Σ(Δi·Ni)²`，`N = Na·Nb·Nc`。
//!
//! 形状在配置阶段通过 [`CrystalShape::kernel`] 选定为函数指针，逐像素计算时不再分派。
//!
//! ## 依赖关系
//! - 被 `models/config.rs` 重新导出
//! - 被 `simulator/engine.rs` 调用

use crate::physics::vector::Vec3;

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// 球形晶体的归一化常数
pub const ROUND_NORMALIZATION: f64 = 0.723601254558268;

/// GAUSS 形状的宽度参数
const GAUSS_WIDTH: f64 = 0.63;

/// TOPHAT 形状的截断半径平方
const TOPHAT_CUTOFF: f64 = 0.3969;

/// 晶体形状模型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CrystalShape {
    /// 平行六面体
    #[default]
    Square,
    /// 球形
    Round,
    /// 高斯
    Gauss,
    /// 截断球
    Tophat,
}

impl std::fmt::Display for CrystalShape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CrystalShape::Square => write!(f, "square"),
            CrystalShape::Round => write!(f, "round"),
            CrystalShape::Gauss => write!(f, "gauss"),
            CrystalShape::Tophat => write!(f, "tophat"),
        }
    }
}

/// 形状因子核函数：(Δ, N, fudge) -> F_latt
pub type LatticeKernel = fn(&Vec3, &Vec3, f64) -> f64;

impl CrystalShape {
    /// 选择对应的形状因子核函数
    pub fn kernel(self) -> LatticeKernel {
        match self {
            CrystalShape::Square => square_lattice,
            CrystalShape::Round => round_lattice,
            CrystalShape::Gauss => gauss_lattice,
            CrystalShape::Tophat => tophat_lattice,
        }
    }
}

/// 广义 sinc：sin(N·u) / sin(u)
///
/// u 为 π 的整数倍时取极限值 `N·(−1)^(n(N−1))`。
pub fn sincg(u: f64, n: f64) -> f64 {
    if u.abs() < 1e-10 {
        return n;
    }

    let ratio = u / PI;
    let nearest = ratio.round();
    if (ratio - nearest).abs() < 1e-10 / PI {
        let parity = (nearest as i64).wrapping_mul(n as i64 - 1).rem_euclid(2);
        return if parity == 0 { n } else { -n };
    }

    let mut denominator = u.sin();
    if denominator.abs() < f64::EPSILON {
        denominator = f64::EPSILON.copysign(denominator);
    }
    (n * u).sin() / denominator
}

/// 三维 sinc：3·(sin x / x − cos x) / x²
pub fn sinc3(x: f64) -> f64 {
    if x.abs() < 1e-10 {
        return 1.0;
    }
    3.0 * (x.sin() / x - x.cos()) / (x * x)
}

/// hrad² = Σ(Δi·Ni)²
fn hrad_sqr(delta: &Vec3, cells: &Vec3) -> f64 {
    (0..3).map(|i| (delta[i] * cells[i]).powi(2)).sum()
}

fn square_lattice(delta: &Vec3, cells: &Vec3, _fudge: f64) -> f64 {
    sincg(PI * delta[0], cells[0]) * sincg(PI * delta[1], cells[1]) * sincg(PI * delta[2], cells[2])
}

fn round_lattice(delta: &Vec3, cells: &Vec3, fudge: f64) -> f64 {
    let n_total = cells[0] * cells[1] * cells[2];
    let radius = (fudge * hrad_sqr(delta, cells)).sqrt();
    n_total * ROUND_NORMALIZATION * sinc3(PI * radius)
}

fn gauss_lattice(delta: &Vec3, cells: &Vec3, fudge: f64) -> f64 {
    let n_total = cells[0] * cells[1] * cells[2];
    n_total * (-hrad_sqr(delta, cells) * fudge / GAUSS_WIDTH).exp()
}

fn tophat_lattice(delta: &Vec3, cells: &Vec3, fudge: f64) -> f64 {
    let n_total = cells[0] * cells[1] * cells[2];
    if hrad_sqr(delta, cells) * fudge < TOPHAT_CUTOFF {
        n_total
    } else {
        0.0
    }
}
