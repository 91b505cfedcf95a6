//! # 批量执行器
//!
//! 在独立的 rayon 线程池中并行执行批量任务。
//!
//! ## 功能
//! - 基于 rayon 的并行迭代
//! - 进度条显示（可关闭）
//! - 处理条目计数与耗时统计
//!
//! ## 依赖关系
//! - 被 `simulator/engine.rs` 调用
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行计算

use crate::error::{Result, SimError};
use crate::utils::progress;

use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// 批量执行结果统计
#[derive(Debug, Default)]
pub struct BatchResult<R> {
    /// 按输入顺序排列的结果
    pub results: Vec<R>,
    /// 批次数
    pub batches: usize,
    /// 处理的条目总数
    pub items: usize,
    /// 耗时
    pub elapsed: Duration,
}

/// 批量执行器
pub struct BatchRunner {
    /// 并行作业数
    jobs: usize,
    /// 是否显示进度条
    show_progress: bool,
}

impl BatchRunner {
    /// 创建新的批量执行器，0 表示使用全部核心
    pub fn new(jobs: usize) -> Self {
        let jobs = if jobs == 0 { num_cpus::get() } else { jobs };
        Self {
            jobs,
            show_progress: false,
        }
    }

    /// 设置是否显示进度条
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn jobs(&self) -> usize {
        self.jobs
    }

    /// 并行处理批次列表
    ///
    /// `size` 给出每个批次包含的条目数，用于进度条计数。
    pub fn run<T, R, S, F>(&self, batches: &[T], message: &str, size: S, processor: F) -> Result<BatchResult<R>>
    where
        T: Sync,
        R: Send,
        S: Fn(&T) -> usize + Sync,
        F: Fn(&T) -> R + Sync + Send,
    {
        let start = Instant::now();
        let total: usize = batches.iter().map(&size).sum();
        let pb = if self.show_progress {
            progress::create_progress_bar(total as u64, message)
        } else {
            indicatif::ProgressBar::hidden()
        };

        let item_count = AtomicUsize::new(0);

        // 配置 rayon 线程池
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.jobs)
            .build()
            .map_err(|e| SimError::Other(format!("Failed to build thread pool: {}", e)))?;

        let results: Vec<R> = pool.install(|| {
            batches
                .par_iter()
                .map(|batch| {
                    let result = processor(batch);
                    let n = size(batch);
                    item_count.fetch_add(n, Ordering::Relaxed);
                    pb.inc(n as u64);
                    result
                })
                .collect()
        });

        pb.finish_and_clear();

        Ok(BatchResult {
            results,
            batches: batches.len(),
            items: item_count.into_inner(),
            elapsed: start.elapsed(),
        })
    }
}
