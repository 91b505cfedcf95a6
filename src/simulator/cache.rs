//! # φ 延续缓存
//!
//! 在多次独立的像素批量计算之间复用旋转基矢。
//!
//! 缓存由两部分组成：共享基矢的 arena，以及按 (slow, fast) 排列的稠密槽位索引。
//! 存入的是原始计算结果的共享引用，不做复制，取出的值与存入时是同一对象。
//!
//! 存取需成对、按顺序使用：先 [`PhiCarryoverCache::store`]，后 [`PhiCarryoverCache::retrieve`]。
//!
//! ## 依赖关系
//! - 被 `simulator/engine.rs` 的 `run_with_cache` 使用
//! - 存储 `models/crystal.rs` 的 RotatedLattice

use crate::batch::Pixel;
use crate::error::{Result, SimError};
use crate::models::RotatedLattice;

use ndarray::Array2;
use std::sync::Arc;

/// φ 延续缓存
#[derive(Debug, Clone)]
pub struct PhiCarryoverCache {
    arena: Vec<Arc<RotatedLattice>>,
    slots: Array2<Option<usize>>,
}

impl PhiCarryoverCache {
    /// 创建与探测器同尺寸的空缓存
    pub fn new(shape: (usize, usize)) -> Self {
        Self {
            arena: Vec::new(),
            slots: Array2::from_elem(shape, None),
        }
    }

    pub fn shape(&self) -> (usize, usize) {
        self.slots.dim()
    }

    /// arena 中不同基矢的数量
    pub fn arena_len(&self) -> usize {
        self.arena.len()
    }

    /// 已填充的槽位数
    pub fn cached_pixels(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    fn check(&self, pixel: Pixel) -> Result<()> {
        let (ns, nf) = self.shape();
        if pixel.slow >= ns || pixel.fast >= nf {
            return Err(SimError::InvalidArgument(format!(
                "pixel ({}, {}) lies outside the {}x{} cache",
                pixel.slow, pixel.fast, ns, nf
            )));
        }
        Ok(())
    }

    /// 存入像素对应的基矢；与 arena 末尾为同一对象时复用该条目
    pub fn store(&mut self, pixel: Pixel, lattice: Arc<RotatedLattice>) -> Result<()> {
        self.check(pixel)?;
        let index = match self.arena.last() {
            Some(last) if Arc::ptr_eq(last, &lattice) => self.arena.len() - 1,
            _ => {
                self.arena.push(lattice);
                self.arena.len() - 1
            }
        };
        self.slots[[pixel.slow, pixel.fast]] = Some(index);
        Ok(())
    }

    /// 取出像素对应的基矢
    pub fn retrieve(&self, pixel: Pixel) -> Result<Option<Arc<RotatedLattice>>> {
        self.check(pixel)?;
        Ok(self.slots[[pixel.slow, pixel.fast]].map(|i| Arc::clone(&self.arena[i])))
    }

    /// 清空全部条目
    pub fn clear(&mut self) {
        self.arena.clear();
        self.slots.fill(None);
    }
}
