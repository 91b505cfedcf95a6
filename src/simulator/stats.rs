//! # 图像统计
//!
//! 在选中像素上统计最大值及其位置、均值、均方根与均方根偏差。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs` 和 `io/export.rs` 使用

use crate::batch::Pixel;

use ndarray::Array2;
use serde::Serialize;

/// 图像统计量
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImageStats {
    /// 统计像素数
    pub count: usize,
    /// 强度总和
    pub sum: f64,
    /// 最大强度
    pub max_i: f64,
    /// 最大强度所在像素
    pub max_pixel: Option<Pixel>,
    pub mean: f64,
    /// sqrt(ΣI²/n)
    pub rms: f64,
    /// sqrt(Σ(I−mean)²/n)
    pub rmsd: f64,
}

impl ImageStats {
    /// 在给定像素上统计
    pub fn from_pixels(image: &Array2<f64>, pixels: &[Pixel]) -> Self {
        let count = pixels.len();
        if count == 0 {
            return Self {
                count: 0,
                sum: 0.0,
                max_i: 0.0,
                max_pixel: None,
                mean: 0.0,
                rms: 0.0,
                rmsd: 0.0,
            };
        }

        let mut sum = 0.0;
        let mut sum_sqr = 0.0;
        let mut max_i = f64::NEG_INFINITY;
        let mut max_pixel = None;
        for p in pixels {
            let v = image[[p.slow, p.fast]];
            sum += v;
            sum_sqr += v * v;
            if v > max_i {
                max_i = v;
                max_pixel = Some(*p);
            }
        }

        let n = count as f64;
        let mean = sum / n;
        let dev: f64 = pixels
            .iter()
            .map(|p| (image[[p.slow, p.fast]] - mean).powi(2))
            .sum();

        Self {
            count,
            sum,
            max_i,
            max_pixel,
            mean,
            rms: (sum_sqr / n).sqrt(),
            rmsd: (dev / n).sqrt(),
        }
    }

    /// 在全部像素上统计
    pub fn from_image(image: &Array2<f64>) -> Self {
        let (ns, nf) = image.dim();
        let pixels: Vec<Pixel> = (0..ns)
            .flat_map(|s| (0..nf).map(move |f| Pixel::new(s, f)))
            .collect();
        Self::from_pixels(image, &pixels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_basic_stats() {
        let image = array![[1.0, 2.0], [3.0, 6.0]];
        let stats = ImageStats::from_image(&image);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.max_i, 6.0);
        assert_eq!(stats.max_pixel, Some(Pixel::new(1, 1)));
        assert!((stats.mean - 3.0).abs() < 1e-12);
        assert!((stats.rms - (50.0f64 / 4.0).sqrt()).abs() < 1e-12);
        assert!((stats.rmsd - (14.0f64 / 4.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_subset_and_empty() {
        let image = array![[1.0, 9.0], [3.0, 6.0]];
        let stats = ImageStats::from_pixels(&image, &[Pixel::new(1, 0), Pixel::new(1, 1)]);
        assert_eq!(stats.max_i, 6.0);
        assert!((stats.mean - 4.5).abs() < 1e-12);

        let empty = ImageStats::from_pixels(&image, &[]);
        assert_eq!(empty.count, 0);
        assert!(empty.max_pixel.is_none());
    }
}
