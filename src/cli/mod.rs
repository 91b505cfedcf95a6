//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `simulate`: 计算衍射图像并导出
//! - `inspect`: 打印晶胞、探测器、光源信息，可追踪单个像素
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: geometry, simulate, inspect

pub mod geometry;
pub mod inspect;
pub mod simulate;

use clap::{Parser, Subcommand};

/// braggsim - 单晶 X 射线衍射图像模拟器
#[derive(Parser)]
#[command(name = "braggsim")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Single-crystal X-ray diffraction image simulator", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Simulate a diffraction image and export it
    Simulate(simulate::SimulateArgs),

    /// Print derived geometry and sources, optionally trace one pixel
    Inspect(inspect::InspectArgs),
}
