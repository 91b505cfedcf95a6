//! # 文件输入输出模块
//!
//! 结构因子、光源、取向矩阵、像素列表的读取，以及图像、CSV、热图的导出。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 子模块: hkl, sourcefile, mosflm, pixel_list, export, plot

pub mod export;
pub mod hkl;
pub mod mosflm;
pub mod pixel_list;
pub mod plot;
pub mod sourcefile;
