//! # 结构因子文件读写
//!
//! ## HKL 文本格式
//! ```text
//! # comment
//! h k l F
//! 0 0 1 125.3
//! ...
//! ```
//! 指数范围取文件中出现的最小/最大值，未列出的格点填充默认 F。
//!
//! ## Fdump 二进制格式
//! ```text
//! "h_min h_max k_min k_max l_min l_max\n\f"
//! (h_range+1)·(k_range+1)·(l_range+1) 个小端 f64，按 (h, k, l) 行主序
//! ```
//!
//! ## 依赖关系
//! - 被 `commands/` 使用
//! - 构造 `models/structure_factor.rs` 的 HklTable

use crate::error::{Result, SimError};
use crate::models::structure_factor::{HklBounds, HklTable};

use ndarray::Array3;
use std::fs;
use std::path::Path;

/// Fdump 头部结束标记
const FORM_FEED: u8 = 0x0c;

/// 读取 HKL 文本文件
pub fn read_hkl_file(path: &Path, default_f: f64) -> Result<HklTable> {
    let content = fs::read_to_string(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_hkl_content(&content, &path.display().to_string(), default_f)
}

/// 从字符串内容解析 HKL 文本
pub fn parse_hkl_content(content: &str, name: &str, default_f: f64) -> Result<HklTable> {
    let parse_error = |reason: String| SimError::ParseError {
        format: "hkl".to_string(),
        path: name.to_string(),
        reason,
    };

    let mut reflections = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 4 {
            return Err(parse_error(format!(
                "Expected 'h k l F' at line {}",
                line_num + 1
            )));
        }

        let index = |s: &str| -> Result<i32> {
            s.parse::<i32>()
                .map_err(|_| parse_error(format!("Invalid Miller index '{}' at line {}", s, line_num + 1)))
        };
        let h = index(parts[0])?;
        let k = index(parts[1])?;
        let l = index(parts[2])?;
        let f: f64 = parts[3].parse().map_err(|_| {
            parse_error(format!(
                "Invalid structure factor '{}' at line {}",
                parts[3],
                line_num + 1
            ))
        })?;

        reflections.push((h, k, l, f));
    }

    if reflections.is_empty() {
        return Err(parse_error("No reflections found".to_string()));
    }

    HklTable::from_reflections(&reflections, default_f)
}

/// 写出 Fdump 二进制缓存
pub fn write_fdump(table: &HklTable, path: &Path) -> Result<()> {
    let b = table.bounds();
    let header = format!(
        "{} {} {} {} {} {}\n\x0c",
        b.h_min, b.h_max, b.k_min, b.k_max, b.l_min, b.l_max
    );

    let mut bytes = Vec::with_capacity(header.len() + table.data().len() * 8);
    bytes.extend_from_slice(header.as_bytes());
    for value in table.data().iter() {
        bytes.extend_from_slice(&value.to_le_bytes());
    }

    fs::write(path, bytes).map_err(|e| SimError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    })
}

/// 读取 Fdump 二进制缓存
pub fn read_fdump(path: &Path) -> Result<HklTable> {
    let bytes = fs::read(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_fdump_bytes(&bytes, &path.display().to_string())
}

/// 从字节解析 Fdump
pub fn parse_fdump_bytes(bytes: &[u8], name: &str) -> Result<HklTable> {
    let parse_error = |reason: &str| SimError::ParseError {
        format: "Fdump".to_string(),
        path: name.to_string(),
        reason: reason.to_string(),
    };

    let end = bytes
        .iter()
        .position(|&b| b == FORM_FEED)
        .ok_or_else(|| parse_error("Missing header terminator"))?;
    let header = std::str::from_utf8(&bytes[..end]).map_err(|_| parse_error("Header is not ASCII"))?;

    let values: Vec<i32> = header
        .split_whitespace()
        .map(|s| s.parse::<i32>())
        .collect::<std::result::Result<_, _>>()
        .map_err(|_| parse_error("Invalid index bound in header"))?;
    if values.len() != 6 {
        return Err(parse_error("Header must contain six index bounds"));
    }

    let bounds = HklBounds {
        h_min: values[0],
        h_max: values[1],
        k_min: values[2],
        k_max: values[3],
        l_min: values[4],
        l_max: values[5],
    };
    let shape = bounds.shape();
    let count = shape.0 * shape.1 * shape.2;

    let body = &bytes[end + 1..];
    if body.len() != count * 8 {
        return Err(parse_error(&format!(
            "Expected {} values, found {} bytes",
            count,
            body.len()
        )));
    }

    let data: Vec<f64> = body
        .chunks_exact(8)
        .map(|chunk| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(chunk);
            f64::from_le_bytes(raw)
        })
        .collect();

    let data = Array3::from_shape_vec(shape, data).map_err(|e| parse_error(&e.to_string()))?;
    HklTable::new(bounds, data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
# test reflections
0 0 0 10.0

1 0 0 20.5
-1 2 1 30.25
";

    #[test]
    fn test_parse_hkl_bounds_and_fill() {
        let table = parse_hkl_content(SAMPLE, "sample.hkl", 1.5).unwrap();
        let b = table.bounds();
        assert_eq!((b.h_min, b.h_max), (-1, 1));
        assert_eq!((b.k_min, b.k_max), (0, 2));
        assert_eq!((b.l_min, b.l_max), (0, 1));
        assert_eq!(table.get(1, 0, 0), Some(20.5));
        assert_eq!(table.get(-1, 2, 1), Some(30.25));
        assert_eq!(table.get(0, 1, 1), Some(1.5));
        assert_eq!(table.get(2, 0, 0), None);
    }

    #[test]
    fn test_parse_hkl_errors() {
        assert!(parse_hkl_content("# only comments\n\n", "empty.hkl", 0.0).is_err());
        assert!(parse_hkl_content("1 2 3\n", "short.hkl", 0.0).is_err());
        assert!(parse_hkl_content("1 x 3 4.0\n", "bad.hkl", 0.0).is_err());
    }

    #[test]
    fn test_fdump_file_round_trip() {
        let table = parse_hkl_content(SAMPLE, "sample.hkl", 0.0).unwrap();
        let path = std::env::temp_dir().join(format!("braggsim_fdump_{}.bin", std::process::id()));

        write_fdump(&table, &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"-1 1 0 2 0 1\n\x0c"));

        let loaded = read_fdump(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(loaded.bounds(), table.bounds());
        assert_eq!(loaded.data(), table.data());
    }

    #[test]
    fn test_fdump_truncated_body() {
        let mut bytes = b"0 1 0 0 0 0\n\x0c".to_vec();
        bytes.extend_from_slice(&1.0f64.to_le_bytes());
        assert!(parse_fdump_bytes(&bytes, "short.bin").is_err());

        bytes.extend_from_slice(&2.0f64.to_le_bytes());
        let table = parse_fdump_bytes(&bytes, "ok.bin").unwrap();
        assert_eq!(table.get(1, 0, 0), Some(2.0));
    }
}
