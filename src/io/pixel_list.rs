//! # 像素列表读取
//!
//! 每行 `slow fast` 两个整数，`#` 开头为注释，空行忽略。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 使用
//! - 产生 `batch/collector.rs` 的 Pixel

use crate::batch::Pixel;
use crate::error::{Result, SimError};

use std::fs;
use std::path::Path;

/// 读取像素列表文件
pub fn read_pixel_list(path: &Path) -> Result<Vec<Pixel>> {
    let content = fs::read_to_string(path).map_err(|e| SimError::FileReadError {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_pixel_list(&content, &path.display().to_string())
}

/// 从字符串内容解析像素列表
pub fn parse_pixel_list(content: &str, name: &str) -> Result<Vec<Pixel>> {
    let mut pixels = Vec::new();
    for (line_num, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let values: Vec<usize> = line
            .split_whitespace()
            .take(2)
            .map(|s| s.parse::<usize>())
            .collect::<std::result::Result<_, _>>()
            .map_err(|_| SimError::ParseError {
                format: "pixel list".to_string(),
                path: name.to_string(),
                reason: format!("Invalid pixel index at line {}", line_num + 1),
            })?;

        match values.as_slice() {
            [slow, fast] => pixels.push(Pixel::new(*slow, *fast)),
            _ => {
                return Err(SimError::ParseError {
                    format: "pixel list".to_string(),
                    path: name.to_string(),
                    reason: format!("Expected 'slow fast' at line {}", line_num + 1),
                })
            }
        }
    }
    Ok(pixels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_pixel_list() {
        let content = "# slow fast\n3 4\n\n10 2 extra\n";
        let pixels = parse_pixel_list(content, "pixels.txt").unwrap();
        assert_eq!(pixels, vec![Pixel::new(3, 4), Pixel::new(10, 2)]);
    }

    #[test]
    fn test_invalid_lines() {
        assert!(parse_pixel_list("5\n", "pixels.txt").is_err());
        assert!(parse_pixel_list("-1 2\n", "pixels.txt").is_err());
    }
}
