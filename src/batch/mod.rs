//! # 批量处理模块
//!
//! 提供像素选择与并行批量执行能力。
//!
//! ## 功能
//! - 按全幅/ROI/列表/随机子集收集像素
//! - 按行分批
//! - 并行处理
//! - 进度反馈与统计
//!
//! ## 依赖关系
//! - 被 `simulator/` 和 `commands/` 使用
//! - 使用 `rayon` 进行并行处理
//! - 使用 `indicatif` 显示进度

pub mod collector;
pub mod runner;

pub use collector::{Pixel, PixelBatch, PixelCollector, PixelSelection};
pub use runner::{BatchResult, BatchRunner};
