//! # 采样参数自动补全
//!
//! 发散、色散、厚度三类采样都由 (步数, 范围, 步长) 描述，
//! 用户可以只给出其中一部分，其余按固定规则补全。
//!
//! | 给出 | 结果 |
//! |------|------|
//! | 无 | count=1, range=0, step=0 |
//! | 仅 step | count=2, range=step |
//! | 仅 range | count=2, step=range |
//! | 仅 count | range=默认值, count≥2, step=range/(count−1) |
//! | range + step | count=⌈range/step⌉ |
//! | count + range | step=range/max(count−1, 1) |
//! | count + step | count=2, range=step |
//! | 全部 | 原样使用 |
//!
//! ## 依赖关系
//! - 被 `sampling/sources.rs` 和 `models/detector.rs` 使用

use crate::error::{Result, SimError};

use serde::{Deserialize, Serialize};

/// 用户给出的采样参数，None 表示未设置
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SamplingRequest {
    pub count: Option<u32>,
    pub range: Option<f64>,
    pub step: Option<f64>,
}

impl SamplingRequest {
    /// 是否设置了任一参数
    pub fn is_set(&self) -> bool {
        self.count.is_some() || self.range.is_some() || self.step.is_some()
    }
}

/// 补全后的采样方案
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplingPlan {
    pub count: u32,
    pub range: f64,
    pub step: f64,
}

/// 参数类别，决定仅给出步数时的默认范围
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    /// 发散角 (弧度)
    Angle,
    /// 相对色散
    Dispersion,
    /// 探测器厚度 (m)
    Thickness,
}

impl ParameterKind {
    /// 默认范围
    pub fn default_range(self) -> f64 {
        match self {
            ParameterKind::Angle => 1.0,
            ParameterKind::Dispersion => 0.1,
            ParameterKind::Thickness => 0.5e-6,
        }
    }
}

/// 按规则补全采样参数
pub fn auto_select(request: &SamplingRequest, kind: ParameterKind) -> Result<SamplingPlan> {
    if request.count == Some(0) {
        return Err(SimError::ConfigurationError(format!(
            "{:?} sampling count must be at least 1",
            kind
        )));
    }
    if request.range.is_some_and(|r| !(r >= 0.0)) {
        return Err(SimError::ConfigurationError(format!(
            "{:?} sampling range must be non-negative",
            kind
        )));
    }
    if request.step.is_some_and(|s| !(s > 0.0)) {
        return Err(SimError::ConfigurationError(format!(
            "{:?} sampling step must be positive",
            kind
        )));
    }

    let plan = match (request.count, request.range, request.step) {
        (None, None, None) => SamplingPlan {
            count: 1,
            range: 0.0,
            step: 0.0,
        },
        (None, None, Some(step)) | (Some(_), None, Some(step)) => SamplingPlan {
            count: 2,
            range: step,
            step,
        },
        (None, Some(range), None) => SamplingPlan {
            count: 2,
            range,
            step: range,
        },
        (None, Some(range), Some(step)) => SamplingPlan {
            count: ((range / step).ceil() as u32).max(1),
            range,
            step,
        },
        (Some(count), None, None) => {
            let range = kind.default_range();
            let count = count.max(2);
            SamplingPlan {
                count,
                range,
                step: range / (count - 1) as f64,
            }
        }
        (Some(count), Some(range), None) => SamplingPlan {
            count,
            range,
            step: range / count.saturating_sub(1).max(1) as f64,
        },
        (Some(count), Some(range), Some(step)) => SamplingPlan { count, range, step },
    };

    Ok(plan)
}
