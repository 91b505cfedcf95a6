//! # braggsim - 单晶 X 射线衍射图像模拟器
//!
//! 按运动学近似逐像素累加晶体的布拉格散射，输出探测器上的强度图像。
//!
//! ## 子命令
//! - `simulate` - 计算衍射图像并导出 (float / PGM / 热图 / CSV)
//! - `inspect`  - 打印晶胞、探测器、光源，可追踪单个像素
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/        (命令行参数定义)
//!   ├── commands/   (命令执行逻辑)
//!   │     ├── io/         (文件读写)
//!   │     └── simulator/  (像素累加引擎)
//!   │           ├── models/    (晶体、探测器、结构因子)
//!   │           ├── sampling/  (光源与采样)
//!   │           ├── batch/     (像素分批与并行)
//!   │           └── physics/   (向量、形状因子、偏振、随机数)
//!   ├── utils/      (工具函数)
//!   └── error.rs    (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod error;
mod io;
mod models;
mod physics;
mod sampling;
mod simulator;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
