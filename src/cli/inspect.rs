//! # inspect 子命令 CLI 定义
//!
//! 不渲染图像，只打印派生几何与光源，可选追踪单个像素。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 嵌入 `cli/geometry.rs` 的 GeometryArgs
//! - 参数传递给 `commands/inspect.rs`

use crate::cli::geometry::GeometryArgs;

use clap::Args;

/// inspect 子命令参数
#[derive(Args, Debug)]
pub struct InspectArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    /// Trace every sub-path of one pixel: slow fast
    #[arg(long, num_args = 2, value_names = ["SLOW", "FAST"])]
    pub trace: Option<Vec<usize>>,

    /// Maximum number of sources to list
    #[arg(long, default_value_t = 20)]
    pub max_sources: usize,

    /// Maximum number of trace entries to list
    #[arg(long, default_value_t = 50)]
    pub max_entries: usize,
}
