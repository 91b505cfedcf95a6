//! # 衍射图像热图
//!
//! 使用 `plotters` 库将强度图像渲染为对数刻度热图。
//!
//! ## 功能
//! - PNG 和 SVG 输出
//! - 图像大于画布时按块取最大值降采样，保留布拉格峰
//! - 颜色按 `ln(1 + I) / ln(1 + max_I)` 映射
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 调用
//! - 使用 `plotters` 渲染图表

use crate::error::{Result, SimError};

use ndarray::Array2;
use plotters::prelude::*;
use std::path::Path;

/// 热图色阶节点：黑 → 深蓝 → 红 → 黄 → 白
const PALETTE: [(f64, (u8, u8, u8)); 5] = [
    (0.0, (0, 0, 0)),
    (0.25, (20, 30, 140)),
    (0.5, (200, 30, 40)),
    (0.75, (250, 210, 40)),
    (1.0, (255, 255, 255)),
];

/// 生成热图
pub fn generate_heatmap(
    image: &Array2<f64>,
    output_path: &Path,
    title: &str,
    max_cells: usize,
    use_svg: bool,
) -> Result<()> {
    let binned = downsample_max(image, max_cells.max(1));
    let (ns, nf) = binned.dim();
    let cell = (max_cells.max(1) / ns.max(nf).max(1)).max(1) as u32;
    let width = nf as u32 * cell + 120;
    let height = ns as u32 * cell + 100;

    if use_svg {
        let root = SVGBackend::new(output_path, (width, height)).into_drawing_area();
        draw_heatmap(&root, &binned, image.dim(), title)?;
        root.present()
            .map_err(|e| SimError::PlotError(e.to_string()))?;
    } else {
        let root = BitMapBackend::new(output_path, (width, height)).into_drawing_area();
        draw_heatmap(&root, &binned, image.dim(), title)?;
        root.present()
            .map_err(|e| SimError::PlotError(e.to_string()))?;
    }
    Ok(())
}

/// 按块取最大值，使两个方向都不超过 `max_cells`
pub fn downsample_max(image: &Array2<f64>, max_cells: usize) -> Array2<f64> {
    let (ns, nf) = image.dim();
    let factor = ns.max(nf).div_ceil(max_cells).max(1);
    if factor == 1 {
        return image.clone();
    }

    let (bs, bf) = (ns.div_ceil(factor), nf.div_ceil(factor));
    let mut binned = Array2::zeros((bs, bf));
    for ((s, f), v) in image.indexed_iter() {
        let target = &mut binned[[s / factor, f / factor]];
        if *v > *target {
            *target = *v;
        }
    }
    binned
}

/// 对数归一化强度到 [0, 1]
fn log_normalize(value: f64, log_max: f64) -> f64 {
    if log_max <= 0.0 || value <= 0.0 {
        0.0
    } else {
        ((1.0 + value).ln() / log_max).clamp(0.0, 1.0)
    }
}

/// 色阶插值
fn palette_color(t: f64) -> RGBColor {
    for pair in PALETTE.windows(2) {
        let (t0, c0) = pair[0];
        let (t1, c1) = pair[1];
        if t <= t1 {
            let w = if t1 > t0 { (t - t0) / (t1 - t0) } else { 0.0 };
            let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * w).round() as u8;
            return RGBColor(mix(c0.0, c1.0), mix(c0.1, c1.1), mix(c0.2, c1.2));
        }
    }
    let (_, last) = PALETTE[PALETTE.len() - 1];
    RGBColor(last.0, last.1, last.2)
}

/// 绘制热图的核心逻辑
fn draw_heatmap<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    binned: &Array2<f64>,
    full_shape: (usize, usize),
    title: &str,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)
        .map_err(|e| SimError::PlotError(format!("{:?}", e)))?;

    let (ns, nf) = binned.dim();
    let (full_s, full_f) = full_shape;
    let scale_s = full_s as f64 / ns.max(1) as f64;
    let scale_f = full_f as f64 / nf.max(1) as f64;

    let mut chart = ChartBuilder::on(root)
        .caption(title, ("sans-serif", 24).into_font())
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(0.0..full_f as f64, 0.0..full_s as f64)
        .map_err(|e| SimError::PlotError(format!("{:?}", e)))?;

    chart
        .configure_mesh()
        .disable_mesh()
        .x_desc("fast (pixel)")
        .y_desc("slow (pixel)")
        .x_label_style(("sans-serif", 14))
        .y_label_style(("sans-serif", 14))
        .axis_desc_style(("sans-serif", 16))
        .draw()
        .map_err(|e| SimError::PlotError(format!("{:?}", e)))?;

    let max = binned.iter().cloned().fold(0.0, f64::max);
    let log_max = (1.0 + max).ln();

    chart
        .draw_series(binned.indexed_iter().map(|((s, f), v)| {
            let color = palette_color(log_normalize(*v, log_max));
            let x0 = f as f64 * scale_f;
            // 第 0 行画在顶部
            let y0 = full_s as f64 - (s + 1) as f64 * scale_s;
            Rectangle::new([(x0, y0), (x0 + scale_f, y0 + scale_s)], color.filled())
        }))
        .map_err(|e| SimError::PlotError(format!("{:?}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_downsample_keeps_peaks() {
        let mut image = Array2::<f64>::zeros((10, 10));
        image[[7, 3]] = 42.0;
        let binned = downsample_max(&image, 4);
        assert_eq!(binned.dim(), (4, 4));
        assert_eq!(binned[[2, 1]], 42.0);
        assert_eq!(binned.sum(), 42.0);
    }

    #[test]
    fn test_downsample_small_image_unchanged() {
        let image = array![[1.0, 2.0], [3.0, 4.0]];
        assert_eq!(downsample_max(&image, 8), image);
    }

    #[test]
    fn test_log_normalize_and_palette() {
        let log_max = (1.0f64 + 100.0).ln();
        assert_eq!(log_normalize(0.0, log_max), 0.0);
        assert!((log_normalize(100.0, log_max) - 1.0).abs() < 1e-12);
        assert_eq!(log_normalize(5.0, 0.0), 0.0);

        let black = palette_color(0.0);
        let white = palette_color(1.0);
        assert_eq!((black.0, black.1, black.2), (0, 0, 0));
        assert_eq!((white.0, white.1, white.2), (255, 255, 255));
    }
}
