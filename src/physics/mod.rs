//! # 物理基元模块
//!
//! 无状态的数学与物理核函数。
//!
//! ## 依赖关系
//! - 被 `models/`、`sampling/`、`simulator/` 使用
//! - 子模块: vector, shape, polarization, interpolate, random, units

pub mod interpolate;
pub mod polarization;
pub mod random;
pub mod shape;
pub mod units;
pub mod vector;

pub use random::CLcg;
pub use shape::CrystalShape;
pub use vector::{Mat3, Vec3};
