//! # 像素收集器
//!
//! 根据选择方式收集待计算的像素列表，并按行分批。
//!
//! ## 功能
//! - 全幅、ROI（闭区间）、显式列表、随机子集四种选择
//! - 随机子集使用 `StdRng` 固定种子，结果可复现
//! - 按慢轴行号分组成批次，供并行执行
//!
//! ## 依赖关系
//! - 被 `simulator/engine.rs` 和 `commands/simulate.rs` 调用
//! - 使用 `rand` 抽取随机子集

use crate::error::{Result, SimError};

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 像素坐标
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Pixel {
    pub slow: usize,
    pub fast: usize,
}

impl Pixel {
    pub fn new(slow: usize, fast: usize) -> Self {
        Self { slow, fast }
    }
}

/// 像素选择方式
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub enum PixelSelection {
    /// 全部像素
    #[default]
    Full,
    /// 闭区间 ROI
    Roi {
        fmin: usize,
        fmax: usize,
        smin: usize,
        smax: usize,
    },
    /// 显式像素列表
    List(Vec<Pixel>),
    /// 随机子集
    Random { count: usize, seed: u64 },
}

/// 同一行内的一批像素
#[derive(Debug, Clone)]
pub struct PixelBatch {
    pub slow: usize,
    pub pixels: Vec<Pixel>,
}

/// 像素收集器
pub struct PixelCollector {
    /// (慢轴, 快轴) 像素数
    shape: (usize, usize),
    /// 选择方式
    selection: PixelSelection,
}

impl PixelCollector {
    /// 创建新的像素收集器，默认全幅
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            shape,
            selection: PixelSelection::Full,
        }
    }

    /// 设置选择方式
    pub fn with_selection(mut self, selection: PixelSelection) -> Self {
        self.selection = selection;
        self
    }

    /// 设置 ROI
    pub fn with_roi(self, fmin: usize, fmax: usize, smin: usize, smax: usize) -> Self {
        self.with_selection(PixelSelection::Roi {
            fmin,
            fmax,
            smin,
            smax,
        })
    }

    /// 设置随机子集
    pub fn random(self, count: usize, seed: u64) -> Self {
        self.with_selection(PixelSelection::Random { count, seed })
    }

    pub fn selection(&self) -> &PixelSelection {
        &self.selection
    }

    /// 收集所有选中的像素，按 (slow, fast) 排序
    pub fn collect(&self) -> Result<Vec<Pixel>> {
        let (ns, nf) = self.shape;

        let mut pixels = match &self.selection {
            PixelSelection::Full => (0..ns)
                .flat_map(|s| (0..nf).map(move |f| Pixel::new(s, f)))
                .collect::<Vec<_>>(),
            PixelSelection::Roi {
                fmin,
                fmax,
                smin,
                smax,
            } => {
                if fmin > fmax || smin > smax || *fmax >= nf || *smax >= ns {
                    return Err(SimError::InvalidArgument(format!(
                        "ROI {} {} {} {} lies outside the {}x{} detector",
                        fmin, fmax, smin, smax, nf, ns
                    )));
                }
                (*smin..=*smax)
                    .flat_map(|s| (*fmin..=*fmax).map(move |f| Pixel::new(s, f)))
                    .collect()
            }
            PixelSelection::List(list) => {
                if let Some(p) = list.iter().find(|p| p.slow >= ns || p.fast >= nf) {
                    return Err(SimError::InvalidArgument(format!(
                        "pixel ({}, {}) lies outside the {}x{} detector",
                        p.slow, p.fast, ns, nf
                    )));
                }
                let mut list = list.clone();
                list.sort_unstable();
                list.dedup();
                list
            }
            PixelSelection::Random { count, seed } => {
                let total = ns * nf;
                if *count > total {
                    return Err(SimError::InvalidArgument(format!(
                        "cannot sample {} pixels from a detector with {}",
                        count, total
                    )));
                }
                let mut rng = StdRng::seed_from_u64(*seed);
                rand::seq::index::sample(&mut rng, total, *count)
                    .into_iter()
                    .map(|i| Pixel::new(i / nf, i % nf))
                    .collect()
            }
        };

        pixels.sort_unstable();
        Ok(pixels)
    }

    /// 收集并按行分批
    pub fn batches(&self) -> Result<Vec<PixelBatch>> {
        Ok(group_by_row(self.collect()?))
    }
}

/// 按慢轴行号分组
pub fn group_by_row(pixels: Vec<Pixel>) -> Vec<PixelBatch> {
    let mut rows: BTreeMap<usize, Vec<Pixel>> = BTreeMap::new();
    for p in pixels {
        rows.entry(p.slow).or_default().push(p);
    }
    rows.into_iter()
        .map(|(slow, pixels)| PixelBatch { slow, pixels })
        .collect()
}
