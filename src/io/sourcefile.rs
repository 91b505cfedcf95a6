//! # 光源文件读取
//!
//! 每行一个光源，列为 `X Y Z weight λ`（位置 m，波长 m），`#` 开头为注释。
//! 缺失的位置分量取 0；整行缺失位置时取 `−source_distance·beam`。
//! 缺失权重取 1；波长列只作比对，始终使用中心波长。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 产生 `sampling/sources.rs` 的 Source

use crate::error::{Result, SimError};
use crate::physics::units::angstrom_to_m;
use crate::physics::vector::{magnitude, scale, unitize, Vec3, MAGNITUDE_FLOOR};
use crate::sampling::Source;
use crate::utils::output;

use std::fs;
use std::path::Path;

/// 读取光源文件
pub fn read_sourcefile(
    path: &Path,
    wavelength_a: f64,
    source_distance_m: f64,
    beam_vector: &Vec3,
) -> Result<Vec<Source>> {
    let content = fs::read_to_string(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_source_content(
        &content,
        &path.display().to_string(),
        wavelength_a,
        source_distance_m,
        beam_vector,
    )
}

/// 从字符串内容解析光源列表
pub fn parse_source_content(
    content: &str,
    name: &str,
    wavelength_a: f64,
    source_distance_m: f64,
    beam_vector: &Vec3,
) -> Result<Vec<Source>> {
    let parse_error = |reason: String| SimError::ParseError {
        format: "source".to_string(),
        path: name.to_string(),
        reason,
    };

    let (beam_unit, _) = unitize(beam_vector);
    let default_position = scale(&beam_unit, -source_distance_m);
    let central_m = angstrom_to_m(wavelength_a);

    let mut sources = Vec::new();
    let mut wavelength_mismatch = false;

    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values: Vec<f64> = line
            .split_whitespace()
            .map(|s| s.parse::<f64>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| parse_error(format!("Invalid number at line {}", line_num + 1)))?;

        let position = match values.len() {
            0 => default_position,
            1 => [values[0], 0.0, 0.0],
            2 => [values[0], values[1], 0.0],
            _ => [values[0], values[1], values[2]],
        };
        let position = if magnitude(&position) < MAGNITUDE_FLOOR {
            default_position
        } else {
            position
        };

        let weight = values.get(3).copied().unwrap_or(1.0);
        if let Some(&lambda_m) = values.get(4) {
            if (lambda_m - central_m).abs() > 1e-12 * central_m {
                wavelength_mismatch = true;
            }
        }

        // 位置指向光源，传播方向取反
        let (direction, _) = unitize(&scale(&position, -1.0));
        sources.push(Source {
            direction,
            wavelength: wavelength_a,
            weight,
        });
    }

    if sources.is_empty() {
        return Err(parse_error("No valid source lines found".to_string()));
    }

    if wavelength_mismatch {
        output::print_warning(&format!(
            "Source file wavelengths differ from the central wavelength; all sources use {} Å",
            wavelength_a
        ));
    }

    Ok(sources)
}
