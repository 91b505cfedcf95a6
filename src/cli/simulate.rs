//! # simulate 子命令 CLI 定义
//!
//! 计算衍射图像，支持整幅、ROI、像素列表和随机子集四种像素选择，
//! 以及浮点图像、PGM、热图、CSV 四种输出。
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 嵌入 `cli/geometry.rs` 的 GeometryArgs
//! - 参数传递给 `commands/simulate.rs`

use crate::cli::geometry::GeometryArgs;

use clap::Args;
use std::path::PathBuf;

/// simulate 子命令参数
#[derive(Args, Debug)]
pub struct SimulateArgs {
    #[command(flatten)]
    pub geometry: GeometryArgs,

    // ─────────────────────────────────────────────────────────────
    // 像素选择
    // ─────────────────────────────────────────────────────────────
    /// Region of interest: fmin fmax smin smax (inclusive pixel indices)
    #[arg(long, num_args = 4, value_names = ["FMIN", "FMAX", "SMIN", "SMAX"])]
    pub roi: Option<Vec<usize>>,

    /// File listing pixels to evaluate (slow fast per line)
    #[arg(long, conflicts_with_all = ["roi", "random_pixels"])]
    pub pixel_list: Option<PathBuf>,

    /// Evaluate a random subset of this many pixels
    #[arg(long, conflicts_with = "roi")]
    pub random_pixels: Option<usize>,

    /// Seed for the random pixel subset
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Resolve lattices through the phi-carryover cache
    #[arg(long)]
    pub phi_cache: bool,

    // ─────────────────────────────────────────────────────────────
    // 输出
    // ─────────────────────────────────────────────────────────────
    /// Raw float image output (f32 little-endian, slow-major)
    #[arg(long, default_value = "floatimage.bin")]
    pub floatfile: PathBuf,

    /// 8-bit PGM image output
    #[arg(long)]
    pub pgmfile: Option<PathBuf>,

    /// Multiplier applied before PGM clamping [default: 255 / max_I]
    #[arg(long)]
    pub pgm_scale: Option<f64>,

    /// Heat map output (.png or .svg)
    #[arg(long)]
    pub plot: Option<PathBuf>,

    /// Heat map resolution limit (cells per axis)
    #[arg(long, default_value_t = 512)]
    pub plot_cells: usize,

    /// CSV file of the brightest pixels
    #[arg(long)]
    pub top_csv: Option<PathBuf>,

    /// Number of brightest pixels to report
    #[arg(long, default_value_t = 10)]
    pub top_n: usize,

    /// Per-pixel solid angle image (f32)
    #[arg(long)]
    pub omega_file: Option<PathBuf>,

    /// Per-pixel capture fraction image (f32)
    #[arg(long)]
    pub capture_file: Option<PathBuf>,

    // ─────────────────────────────────────────────────────────────
    // 执行
    // ─────────────────────────────────────────────────────────────
    /// Number of parallel jobs (0 = auto-detect)
    #[arg(short, long, default_value_t = 0)]
    pub jobs: usize,

    /// Hide the progress bar
    #[arg(long)]
    pub no_progress: bool,
}
