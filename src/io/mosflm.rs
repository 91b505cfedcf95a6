//! # MOSFLM 取向矩阵读取
//!
//! 文件含 9 个数，按行主序构成 3×3 矩阵；倒易基矢为矩阵的列，
//! 数值含波长因子，除以 λ 后得到 Å⁻¹ 单位的 a*, b*, c*。
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 结果写入 `models/config.rs` 的 `CrystalConfig::orientation`

use crate::error::{Result, SimError};
use crate::physics::vector::Vec3;

use std::fs;
use std::path::Path;

/// 读取 MOSFLM 矩阵文件
pub fn read_mosflm_matrix(path: &Path, wavelength_a: f64) -> Result<[Vec3; 3]> {
    let content = fs::read_to_string(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_mosflm_content(&content, &path.display().to_string(), wavelength_a)
}

/// 从字符串内容解析 MOSFLM 矩阵
pub fn parse_mosflm_content(content: &str, name: &str, wavelength_a: f64) -> Result<[Vec3; 3]> {
    let parse_error = |reason: String| SimError::ParseError {
        format: "mosflm".to_string(),
        path: name.to_string(),
        reason,
    };

    if !(wavelength_a > 0.0) {
        return Err(SimError::InvalidArgument(
            "wavelength must be positive to read a MOSFLM matrix".to_string(),
        ));
    }

    let values: Vec<f64> = content
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('#'))
        .flat_map(|l| l.split_whitespace())
        .filter_map(|s| s.parse::<f64>().ok())
        .collect();

    if values.len() != 9 {
        return Err(parse_error(format!(
            "Expected 9 numeric values, found {}",
            values.len()
        )));
    }

    let column = |j: usize| -> Vec3 {
        [
            values[j] / wavelength_a,
            values[3 + j] / wavelength_a,
            values[6 + j] / wavelength_a,
        ]
    };

    Ok([column(0), column(1), column(2)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::config::CrystalConfig;
    use crate::models::crystal::compute_cell_tensors;

    #[test]
    fn test_columns_are_reciprocal_vectors() {
        let content = "0.01 0.02 0.03\n0.04 0.05 0.06\n0.07 0.08 0.09\n";
        let [a, b, c] = parse_mosflm_content(content, "A.mat", 2.0).unwrap();
        assert_eq!(a, [0.005, 0.02, 0.035]);
        assert_eq!(b, [0.01, 0.025, 0.04]);
        assert_eq!(c, [0.015, 0.03, 0.045]);
    }

    #[test]
    fn test_cubic_matrix_recovers_cell() {
        // λ = 1 Å，a* = 0.02 Å⁻¹ → a = 50 Å
        let content = "0.02 0 0\n0 0.02 0\n0 0 0.02\n";
        let orientation = parse_mosflm_content(content, "A.mat", 1.0).unwrap();
        let config = CrystalConfig {
            orientation: Some(orientation),
            ..CrystalConfig::default()
        };
        let t = compute_cell_tensors(&config).unwrap();
        for i in 0..3 {
            assert!((t.cell[i] - 50.0).abs() < 1e-9);
            assert!((t.cell[3 + i] - 90.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_wrong_value_count() {
        assert!(parse_mosflm_content("1 2 3\n4 5 6\n", "A.mat", 1.0).is_err());
    }
}
