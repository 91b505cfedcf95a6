//! # 模拟器模块
//!
//! 逐像素衍射强度累加、φ 延续缓存与图像统计。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: engine, cache, stats

pub mod cache;
pub mod engine;
pub mod stats;

pub use cache::PhiCarryoverCache;
pub use engine::{Diagnostics, PixelTrace, SimulationOutput, Simulator, TraceEntry};
pub use stats::ImageStats;
