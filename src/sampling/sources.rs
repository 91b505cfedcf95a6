//! # 光源列表生成
//!
//! 将发散网格与色散网格展开为扁平的 (方向, 波长, 权重) 列表。
//!
//! ## 算法概述
//! 1. 水平、垂直发散与色散分别经 [`auto_select`] 补全
//! 2. 网格点 `hdiv_i = −hrange/2 + i·hstep`，`vdiv_j` 同理
//! 3. `round_div` 开启时丢弃 `(h/(hr/2))² + (v/(vr/2))² > 1` 的点，仅范围非零的轴参与
//! 4. 方向 = 光束方向先绕偏振轴转 vdiv，再绕 `beam × polarization` 转 hdiv
//! 5. 每个方向与 `λ_k = λ0·(1 − disp/2 + k·dispstep)` 组合
//!
//! 权重只作记录，归一化时每个光源等权。
//!
//! ## 依赖关系
//! - 被 `simulator/engine.rs`、`commands/` 使用
//! - 使用 `sampling/auto_select.rs`
//! - `io/sourcefile.rs` 产生同一类型的光源

use crate::error::{Result, SimError};
use crate::models::config::BeamConfig;
use crate::physics::vector::{cross, rotate_axis, unitize, Vec3};
use crate::sampling::auto_select::{auto_select, ParameterKind, SamplingPlan};

use serde::{Deserialize, Serialize};

/// 椭圆裁剪的容差
const ROUND_DIV_TOLERANCE: f64 = 1e-9;

/// 单个光源
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// 入射方向（单位向量，沿传播方向）
    pub direction: Vec3,
    /// 波长 (Å)
    pub wavelength: f64,
    /// 权重（仅记录）
    pub weight: f64,
}

/// 补全后的发散与色散方案
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourcePlan {
    pub hdiv: SamplingPlan,
    pub vdiv: SamplingPlan,
    pub dispersion: SamplingPlan,
}

impl SourcePlan {
    /// 由光束配置补全
    pub fn from_beam(beam: &BeamConfig) -> Result<Self> {
        Ok(Self {
            hdiv: auto_select(&beam.hdiv, ParameterKind::Angle)?,
            vdiv: auto_select(&beam.vdiv, ParameterKind::Angle)?,
            dispersion: auto_select(&beam.dispersion, ParameterKind::Dispersion)?,
        })
    }
}

/// 网格第 i 个点的偏移
fn grid_offset(plan: &SamplingPlan, i: u32) -> f64 {
    -plan.range / 2.0 + i as f64 * plan.step
}

/// 该发散点是否落在椭圆外
fn outside_ellipse(hdiv: f64, vdiv: f64, hplan: &SamplingPlan, vplan: &SamplingPlan) -> bool {
    let mut radius = 0.0;
    if hplan.range > 0.0 {
        radius += (hdiv / (hplan.range / 2.0)).powi(2);
    }
    if vplan.range > 0.0 {
        radius += (vdiv / (vplan.range / 2.0)).powi(2);
    }
    radius > 1.0 + ROUND_DIV_TOLERANCE
}

/// 生成发散与色散光源列表
///
/// `beam_vector` 与 `polarization_axis` 取自探测器约定或用户覆盖。
pub fn generate_sources(
    beam: &BeamConfig,
    beam_vector: &Vec3,
    polarization_axis: &Vec3,
) -> Result<Vec<Source>> {
    if !(beam.wavelength_a > 0.0) {
        return Err(SimError::ConfigurationError(
            "wavelength must be positive".to_string(),
        ));
    }

    let plan = SourcePlan::from_beam(beam)?;
    let (beam_unit, _) = unitize(beam_vector);
    let (polar_unit, _) = unitize(polarization_axis);
    let (horizontal_axis, _) = unitize(&cross(&beam_unit, &polar_unit));

    let mut directions = Vec::new();
    for i in 0..plan.hdiv.count {
        let hdiv = grid_offset(&plan.hdiv, i);
        for j in 0..plan.vdiv.count {
            let vdiv = grid_offset(&plan.vdiv, j);
            if beam.round_div && outside_ellipse(hdiv, vdiv, &plan.hdiv, &plan.vdiv) {
                continue;
            }
            let tilted = rotate_axis(&beam_unit, &polar_unit, vdiv);
            let direction = rotate_axis(&tilted, &horizontal_axis, hdiv);
            directions.push(unitize(&direction).0);
        }
    }

    let mut sources = Vec::with_capacity(directions.len() * plan.dispersion.count as usize);
    for direction in &directions {
        for k in 0..plan.dispersion.count {
            let factor = 1.0 - plan.dispersion.range / 2.0 + k as f64 * plan.dispersion.step;
            if !(factor > 0.0) {
                return Err(SimError::ConfigurationError(format!(
                    "dispersion of {} produces a non-positive wavelength",
                    plan.dispersion.range
                )));
            }
            sources.push(Source {
                direction: *direction,
                wavelength: beam.wavelength_a * factor,
                weight: 1.0,
            });
        }
    }

    Ok(sources)
}
