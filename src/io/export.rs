//! # 图像数据导出
//!
//! ## 支持格式
//! - 浮点图像: f32 小端原始数据，(slow, fast) 行主序
//! - PGM (P5): 8 位灰度，强度乘以 `pgm_scale` 后截断到 [0, 255]
//! - CSV: 最亮的 N 个像素 (slow, fast, intensity)
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 调用
//! - 使用 `batch/collector.rs` 的 Pixel
//! - 使用 `csv` 库写入 CSV 文件

use crate::batch::Pixel;
use crate::error::{Result, SimError};

use ndarray::Array2;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

fn write_error(path: &Path, e: std::io::Error) -> SimError {
    SimError::FileWriteError {
        path: path.display().to_string(),
        source: e,
    }
}

/// 导出 f32 浮点图像
pub fn write_float_image(image: &Array2<f64>, output_path: &Path) -> Result<()> {
    let file = File::create(output_path).map_err(|e| write_error(output_path, e))?;
    let mut writer = BufWriter::new(file);

    // 逻辑行主序，与内存布局无关
    for value in image.iter() {
        writer
            .write_all(&(*value as f32).to_le_bytes())
            .map_err(|e| write_error(output_path, e))?;
    }
    writer.flush().map_err(|e| write_error(output_path, e))?;

    Ok(())
}

/// 默认 PGM 缩放：255 / max_I，全零图像为 1
pub fn default_pgm_scale(image: &Array2<f64>) -> f64 {
    let max = image.iter().cloned().fold(0.0, f64::max);
    if max > 0.0 {
        255.0 / max
    } else {
        1.0
    }
}

/// 导出 PGM (P5) 图像，返回实际使用的缩放系数
pub fn write_pgm(image: &Array2<f64>, output_path: &Path, scale: Option<f64>) -> Result<f64> {
    let scale = scale.unwrap_or_else(|| default_pgm_scale(image));
    let (ns, nf) = image.dim();

    let file = File::create(output_path).map_err(|e| write_error(output_path, e))?;
    let mut writer = BufWriter::new(file);

    write!(writer, "P5\n{} {}\n# pixels scaled by {}\n255\n", nf, ns, scale)
        .map_err(|e| write_error(output_path, e))?;

    let bytes: Vec<u8> = image
        .iter()
        .map(|v| (v * scale).clamp(0.0, 255.0).floor() as u8)
        .collect();
    writer.write_all(&bytes).map_err(|e| write_error(output_path, e))?;
    writer.flush().map_err(|e| write_error(output_path, e))?;

    Ok(scale)
}

/// 选中像素中最亮的 N 个，强度降序
pub fn brightest_pixels(image: &Array2<f64>, pixels: &[Pixel], count: usize) -> Vec<(Pixel, f64)> {
    let mut ranked: Vec<(Pixel, f64)> = pixels
        .iter()
        .map(|p| (*p, image[[p.slow, p.fast]]))
        .collect();
    ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
    ranked.truncate(count);
    ranked
}

/// 导出最亮像素为 CSV 格式
pub fn top_pixels_to_csv(
    image: &Array2<f64>,
    pixels: &[Pixel],
    count: usize,
    output_path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path).map_err(SimError::CsvError)?;

    wtr.write_record(["slow", "fast", "intensity"])
        .map_err(SimError::CsvError)?;

    for (pixel, intensity) in brightest_pixels(image, pixels, count) {
        wtr.write_record(&[
            pixel.slow.to_string(),
            pixel.fast.to_string(),
            format!("{:.6e}", intensity),
        ])
        .map_err(SimError::CsvError)?;
    }

    wtr.flush().map_err(|e| write_error(output_path, e))?;

    Ok(())
}
