//! # 数据模型模块
//!
//! 配置结构、晶体模型、结构因子表和探测器几何。
//! 几何对象由配置一次性构造，之后只读，可被并行计算共享。
//!
//! ## 依赖关系
//! - 被 `simulator/`、`io/` 和 `commands/` 使用
//! - 子模块: config, crystal, structure_factor, detector

pub mod config;
pub mod crystal;
pub mod detector;
pub mod structure_factor;

pub use config::{
    BeamConfig, CrystalConfig, CrystalShape, DetectorConfig, DetectorConvention, DetectorPivot,
    Misset, SimulationOptions,
};
pub use crystal::{CellTensors, Crystal, RotatedLattice};
pub use detector::Detector;
pub use structure_factor::{HklBounds, HklTable, StructureFactors};
