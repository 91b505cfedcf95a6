//! # 采样模块
//!
//! 采样参数补全与光源列表生成。
//!
//! ## 依赖关系
//! - 被 `models/`、`simulator/`、`commands/` 使用
//! - 子模块: auto_select, sources

pub mod auto_select;
pub mod sources;

pub use auto_select::{auto_select, ParameterKind, SamplingPlan, SamplingRequest};
pub use sources::{generate_sources, Source, SourcePlan};
