//! # 衍射图像模拟器
//!
//! 对每个选中的像素，在 子像素 × 光源 × φ 步 × 镶嵌块 上累加衍射强度。
//!
//! ## 算法概述
//! 1. 子像素位置 → 衍射方向 d̂
//! 2. 散射矢量 `S = (d̂ − î)/λ`，分数 Miller 指数 `h = S·a, k = S·b, l = S·c`
//! 3. 分辨率截断：`0.5/stol < dmin` 时该子路径不计入（区别于算得的零强度）
//! 4. 子路径强度 `(F_cell·F_latt)²`
//! 5. 乘以 `r_e²·fluence·Ω·polar·capture`，再除以总步数
//!    `steps = 光源数 × 镶嵌块数 × φ 步数 × oversample²`
//!
//! Ω、偏振、吸收默认只在第一个子像素（偏振还取第一个光源）上计算一次，
//! 对应的 oversample 开关打开时改为逐子像素计算。
//!
//! 三三次插值是否关闭在并行计算前决定：按 (slow, fast) 顺序扫描本次
//! 选中像素的全部子路径，任一插值邻域越界即对整次计算关闭插值。
//! 并行期间插值开关只读，结果与线程数无关。
//!
//! ## 依赖关系
//! - 被 `commands/` 调用
//! - 使用 `models/` 的 Crystal、Detector
//! - 使用 `sampling/` 生成光源
//! - 使用 `batch/` 并行执行
//! - 使用 `simulator/cache.rs` 复用旋转基矢

use crate::batch::collector::group_by_row;
use crate::batch::{BatchRunner, Pixel, PixelCollector, PixelSelection};
use crate::error::{Result, SimError};
use crate::models::config::{BeamConfig, SimulationOptions};
use crate::models::structure_factor::nearest_miller;
use crate::models::{Crystal, Detector, RotatedLattice};
use crate::physics::polarization::polarization_factor;
use crate::physics::shape::LatticeKernel;
use crate::physics::units::R_E_SQR;
use crate::physics::vector::{dot, magnitude, scale, sub, unitize, Vec3};
use crate::sampling::{generate_sources, Source};
use crate::simulator::cache::PhiCarryoverCache;
use crate::simulator::stats::ImageStats;

use ndarray::Array2;
use std::sync::Arc;
use std::time::Duration;

/// 模拟结果
#[derive(Debug, Clone)]
pub struct SimulationOutput {
    /// 强度图像，形状 (slow, fast)；未选中像素为 0
    pub image: Array2<f64>,
    /// 实际计算的像素
    pub pixels: Vec<Pixel>,
    /// 并行执行耗时
    pub elapsed: Duration,
}

impl SimulationOutput {
    /// 选中像素上的统计量
    pub fn stats(&self) -> ImageStats {
        ImageStats::from_pixels(&self.image, &self.pixels)
    }
}

/// 逐像素诊断量
#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub solid_angle: Array2<f64>,
    pub capture_fraction: Array2<f64>,
}

/// 像素追踪中的一条子路径
#[derive(Debug, Clone)]
pub struct TraceEntry {
    /// (慢轴, 快轴) 子像素
    pub subpixel: (u32, u32),
    pub source: usize,
    pub phi: usize,
    pub mosaic: usize,
    /// 分数 Miller 指数
    pub hkl: Vec3,
    /// 分辨率截断时为 None
    pub f_cell: Option<f64>,
    pub f_latt: Option<f64>,
    pub intensity: Option<f64>,
}

/// 单像素追踪
#[derive(Debug, Clone)]
pub struct PixelTrace {
    pub pixel: Pixel,
    /// 像素中心位置 (Å)
    pub position: Vec3,
    pub solid_angle: f64,
    pub polarization: f64,
    pub capture_fraction: f64,
    pub entries: Vec<TraceEntry>,
    /// 最终像素强度
    pub intensity: f64,
}

/// 衍射图像模拟器
pub struct Simulator {
    crystal: Crystal,
    detector: Detector,
    sources: Vec<Source>,
    options: SimulationOptions,

    kahn: f64,
    nopolar: bool,
    fluence: f64,
    polarization_axis: Vec3,
    spindle_axis: Vec3,

    lattice: Arc<RotatedLattice>,
    kernel: LatticeKernel,
    /// None 表示不做分辨率截断
    dmin: Option<f64>,
}

impl Simulator {
    /// 构造模拟器；`sources` 为 None 时由光束配置生成发散/色散光源
    pub fn new(
        crystal: Crystal,
        detector: Detector,
        beam: &BeamConfig,
        sources: Option<Vec<Source>>,
        options: SimulationOptions,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&beam.polarization_kahn) {
            return Err(SimError::ConfigurationError(format!(
                "Kahn polarization factor {} must lie in [0, 1]",
                beam.polarization_kahn
            )));
        }
        if !(beam.fluence > 0.0) {
            return Err(SimError::ConfigurationError(
                "fluence must be positive".to_string(),
            ));
        }
        if options.dmin_a < 0.0 {
            return Err(SimError::ConfigurationError(
                "dmin must be non-negative".to_string(),
            ));
        }

        let defaults = *detector.convention_vectors();
        let polarization_axis = beam.polarization_axis.unwrap_or(defaults.polarization);
        let spindle_axis = crystal.config().spindle_axis.unwrap_or(defaults.spindle);

        let sources = match sources {
            Some(s) => s,
            None => generate_sources(beam, &detector.beam_vector(), &polarization_axis)?,
        };
        if sources.is_empty() {
            return Err(SimError::ConfigurationError(
                "at least one source is required".to_string(),
            ));
        }
        if sources.iter().any(|s| !(s.wavelength > 0.0)) {
            return Err(SimError::ConfigurationError(
                "source wavelengths must be positive".to_string(),
            ));
        }

        let lattice = Arc::new(crystal.get_rotated_real_vectors(&spindle_axis));
        let kernel = crystal.config().shape.kernel();
        let dmin = (options.dmin_a > 0.0).then_some(options.dmin_a);

        Ok(Self {
            kahn: beam.polarization_kahn,
            nopolar: beam.nopolar,
            fluence: beam.fluence,
            crystal,
            detector,
            sources,
            options,
            polarization_axis,
            spindle_axis,
            lattice,
            kernel,
            dmin,
        })
    }

    pub fn crystal(&self) -> &Crystal {
        &self.crystal
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn sources(&self) -> &[Source] {
        &self.sources
    }

    pub fn options(&self) -> &SimulationOptions {
        &self.options
    }

    pub fn polarization_axis(&self) -> Vec3 {
        self.polarization_axis
    }

    pub fn spindle_axis(&self) -> Vec3 {
        self.spindle_axis
    }

    /// 共享的旋转基矢
    pub fn rotated_lattice(&self) -> Arc<RotatedLattice> {
        Arc::clone(&self.lattice)
    }

    /// 归一化步数
    pub fn steps(&self) -> usize {
        self.steps_for(&self.lattice)
    }

    /// 以给定基矢集合计算时的步数；缓存带入的基矢可能来自另一组 φ 设置
    fn steps_for(&self, lattice: &RotatedLattice) -> usize {
        let os = self.detector.oversample() as usize;
        self.sources.len() * lattice.len() * os * os
    }

    // ─────────────────────────────────────────────────────────────
    // 子路径
    // ─────────────────────────────────────────────────────────────

    /// 散射矢量 (Å⁻¹)
    fn scattering_vector(diffracted: &Vec3, source: &Source) -> Vec3 {
        scale(&sub(diffracted, &source.direction), 1.0 / source.wavelength)
    }

    /// 是否被分辨率截断
    fn resolution_cut(&self, scattering: &Vec3) -> bool {
        match self.dmin {
            Some(dmin) => {
                let stol = 0.5 * magnitude(scattering);
                stol > 0.0 && 0.5 / stol < dmin
            }
            None => false,
        }
    }

    /// 分数 Miller 指数
    fn miller_indices(real: &[Vec3; 3], scattering: &Vec3) -> Vec3 {
        real.map(|axis| dot(scattering, &axis))
    }

    /// 分数指数、F_cell、F_latt
    fn lattice_terms(&self, real: &[Vec3; 3], scattering: &Vec3) -> (Vec3, f64, f64) {
        let hkl = Self::miller_indices(real, scattering);
        let delta = hkl.map(|x| x - nearest_miller(x));
        let f_latt = (self.kernel)(&delta, &self.crystal.cells(), self.crystal.config().fudge);
        let f_cell = self.crystal.get_structure_factor(hkl[0], hkl[1], hkl[2]);
        (hkl, f_cell, f_latt)
    }

    /// 单条子路径的原始强度 `(F_cell·F_latt)²`；分辨率截断时返回 None
    pub fn evaluate_subpath(&self, real: &[Vec3; 3], diffracted: &Vec3, source: &Source) -> Option<f64> {
        let scattering = Self::scattering_vector(diffracted, source);
        if self.resolution_cut(&scattering) {
            return None;
        }
        let (_, f_cell, f_latt) = self.lattice_terms(real, &scattering);
        Some((f_cell * f_latt).powi(2))
    }

    fn polarization(&self, incident: &Vec3, diffracted: &Vec3) -> f64 {
        if self.nopolar {
            1.0
        } else {
            polarization_factor(self.kahn, incident, diffracted, &self.polarization_axis)
        }
    }

    // ─────────────────────────────────────────────────────────────
    // 像素
    // ─────────────────────────────────────────────────────────────

    /// 单像素最终强度
    fn accumulate_pixel(&self, lattice: &RotatedLattice, pixel: Pixel) -> f64 {
        let os = self.detector.oversample();
        let opts = &self.options;
        let mut total = 0.0;
        let (mut omega0, mut polar0, mut capture0) = (1.0, 1.0, 1.0);

        for sub_s in 0..os {
            for sub_f in 0..os {
                let first_sub = sub_s == 0 && sub_f == 0;
                let position = self.detector.subpixel_position(pixel.slow, pixel.fast, sub_s, sub_f);
                let (diffracted, _) = unitize(&position);

                let mut sub_sum = 0.0;
                for (si, source) in self.sources.iter().enumerate() {
                    let mut path_sum = 0.0;
                    for real in &lattice.real {
                        if let Some(i) = self.evaluate_subpath(real, &diffracted, source) {
                            path_sum += i;
                        }
                    }
                    if opts.oversample_polar {
                        path_sum *= self.polarization(&source.direction, &diffracted);
                    } else if first_sub && si == 0 {
                        polar0 = self.polarization(&source.direction, &diffracted);
                    }
                    sub_sum += path_sum;
                }

                if opts.oversample_omega {
                    sub_sum *= self.detector.solid_angle(&position);
                } else if first_sub {
                    omega0 = self.detector.solid_angle(&position);
                }
                if opts.oversample_thick {
                    sub_sum *= self.detector.capture_fraction(&diffracted);
                } else if first_sub {
                    capture0 = self.detector.capture_fraction(&diffracted);
                }
                total += sub_sum;
            }
        }

        if !opts.oversample_polar {
            total *= polar0;
        }
        if !opts.oversample_omega {
            total *= omega0;
        }
        if !opts.oversample_thick {
            total *= capture0;
        }

        total * R_E_SQR * self.fluence / self.steps_for(lattice) as f64
    }

    /// 顺序扫描像素的全部子路径，插值邻域首次越界时关闭插值
    fn freeze_interpolation<'a>(&self, pixels: impl IntoIterator<Item = (Pixel, &'a RotatedLattice)>) {
        let factors = self.crystal.structure_factors();
        if !factors.interpolation_enabled() {
            return;
        }
        let os = self.detector.oversample();
        for (pixel, lattice) in pixels {
            for sub_s in 0..os {
                for sub_f in 0..os {
                    let position = self.detector.subpixel_position(pixel.slow, pixel.fast, sub_s, sub_f);
                    let (diffracted, _) = unitize(&position);
                    for source in &self.sources {
                        let scattering = Self::scattering_vector(&diffracted, source);
                        if self.resolution_cut(&scattering) {
                            continue;
                        }
                        for real in &lattice.real {
                            let [h, k, l] = Self::miller_indices(real, &scattering);
                            if !factors.check_interpolation(h, k, l) {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    /// 并行计算已解析好基矢的像素批次
    fn execute(&self, batches: Vec<Vec<(Pixel, Arc<RotatedLattice>)>>) -> Result<SimulationOutput> {
        self.freeze_interpolation(
            batches
                .iter()
                .flatten()
                .map(|(pixel, lattice)| (*pixel, lattice.as_ref())),
        );

        let runner = BatchRunner::new(self.options.jobs).with_progress(self.options.show_progress);
        let result = runner.run(
            &batches,
            "Simulating",
            |batch| batch.len(),
            |batch| {
                batch
                    .iter()
                    .map(|(pixel, lattice)| (*pixel, self.accumulate_pixel(lattice, *pixel)))
                    .collect::<Vec<_>>()
            },
        )?;

        let mut image = Array2::zeros(self.detector.shape());
        let mut pixels = Vec::with_capacity(result.items);
        for (pixel, value) in result.results.into_iter().flatten() {
            image[[pixel.slow, pixel.fast]] = value;
            pixels.push(pixel);
        }

        Ok(SimulationOutput {
            image,
            pixels,
            elapsed: result.elapsed,
        })
    }

    /// 按选择方式计算图像
    pub fn run(&self, selection: &PixelSelection) -> Result<SimulationOutput> {
        let pixels = PixelCollector::new(self.detector.shape())
            .with_selection(selection.clone())
            .collect()?;
        self.run_pixels(&pixels)
    }

    /// 计算给定像素
    pub fn run_pixels(&self, pixels: &[Pixel]) -> Result<SimulationOutput> {
        let pixels = PixelCollector::new(self.detector.shape())
            .with_selection(PixelSelection::List(pixels.to_vec()))
            .collect()?;
        let batches = group_by_row(pixels)
            .into_iter()
            .map(|batch| {
                batch
                    .pixels
                    .into_iter()
                    .map(|p| (p, Arc::clone(&self.lattice)))
                    .collect()
            })
            .collect();
        self.execute(batches)
    }

    /// 经由 φ 延续缓存计算：命中时复用缓存中的基矢，未命中时计算并存入
    pub fn run_with_cache(
        &self,
        selection: &PixelSelection,
        cache: &mut PhiCarryoverCache,
    ) -> Result<SimulationOutput> {
        if cache.shape() != self.detector.shape() {
            return Err(SimError::InvalidArgument(format!(
                "cache shape {:?} does not match detector shape {:?}",
                cache.shape(),
                self.detector.shape()
            )));
        }

        let pixels = PixelCollector::new(self.detector.shape())
            .with_selection(selection.clone())
            .collect()?;

        let mut batches = Vec::new();
        for batch in group_by_row(pixels) {
            let mut resolved = Vec::with_capacity(batch.pixels.len());
            for pixel in batch.pixels {
                let lattice = match cache.retrieve(pixel)? {
                    Some(l) => l,
                    None => {
                        let l = Arc::clone(&self.lattice);
                        cache.store(pixel, Arc::clone(&l))?;
                        l
                    }
                };
                resolved.push((pixel, lattice));
            }
            batches.push(resolved);
        }

        self.execute(batches)
    }

    /// 逐像素立体角与吸收比例
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            solid_angle: self.detector.solid_angle_map(),
            capture_fraction: self.detector.capture_fraction_map(),
        }
    }

    /// 列出单像素的全部子路径
    pub fn trace_pixel(&self, pixel: Pixel) -> Result<PixelTrace> {
        let (ns, nf) = self.detector.shape();
        if pixel.slow >= ns || pixel.fast >= nf {
            return Err(SimError::InvalidArgument(format!(
                "pixel ({}, {}) lies outside the {}x{} detector",
                pixel.slow, pixel.fast, ns, nf
            )));
        }

        self.freeze_interpolation([(pixel, self.lattice.as_ref())]);

        let os = self.detector.oversample();
        let mut entries = Vec::new();
        for sub_s in 0..os {
            for sub_f in 0..os {
                let position = self.detector.subpixel_position(pixel.slow, pixel.fast, sub_s, sub_f);
                let (diffracted, _) = unitize(&position);
                for (si, source) in self.sources.iter().enumerate() {
                    let scattering = Self::scattering_vector(&diffracted, source);
                    for (index, real) in self.lattice.real.iter().enumerate() {
                        let hkl = Self::miller_indices(real, &scattering);
                        let (f_cell, f_latt, intensity) = if self.resolution_cut(&scattering) {
                            (None, None, None)
                        } else {
                            let (_, f_cell, f_latt) = self.lattice_terms(real, &scattering);
                            (Some(f_cell), Some(f_latt), Some((f_cell * f_latt).powi(2)))
                        };
                        entries.push(TraceEntry {
                            subpixel: (sub_s, sub_f),
                            source: si,
                            phi: index / self.lattice.mosaic_domains,
                            mosaic: index % self.lattice.mosaic_domains,
                            hkl,
                            f_cell,
                            f_latt,
                            intensity,
                        });
                    }
                }
            }
        }

        let first = self.detector.subpixel_position(pixel.slow, pixel.fast, 0, 0);
        let (diffracted, _) = unitize(&first);

        Ok(PixelTrace {
            pixel,
            position: self.detector.pixel_position(pixel.slow, pixel.fast),
            solid_angle: self.detector.solid_angle(&first),
            polarization: self.polarization(&self.sources[0].direction, &diffracted),
            capture_fraction: self.detector.capture_fraction(&diffracted),
            entries,
            intensity: self.accumulate_pixel(&self.lattice, pixel),
        })
    }
}
