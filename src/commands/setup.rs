//! # 模拟器构造
//!
//! 把 `GeometryArgs` 换算成内部配置并装配 `Simulator`，
//! `simulate` 与 `inspect` 共用。
//!
//! ## 换算
//! - 发散角 mrad → rad，色散百分比 → 相对值
//! - 能量 (eV) → 波长 (Å)
//! - flux/exposure/beamsize → 通量密度
//! - ORGX/ORGY (像素) → 光束中心 (mm)
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`、`commands/inspect.rs` 使用
//! - 使用 `io/` 读取结构因子、取向矩阵、光源文件
//! - 使用 `models/`、`simulator/` 构造模型

use crate::cli::geometry::GeometryArgs;
use crate::error::{Result, SimError};
use crate::io::{hkl, mosflm, sourcefile};
use crate::models::{
    BeamConfig, Crystal, CrystalConfig, Detector, DetectorConfig, HklTable, Misset,
    SimulationOptions,
};
use crate::physics::units::{energy_to_wavelength, fluence_from_flux, DEFAULT_FLUENCE};
use crate::physics::vector::Vec3;
use crate::sampling::SamplingRequest;
use crate::simulator::Simulator;
use crate::utils::{output, progress};

use std::path::Path;

/// mrad → rad
const MRAD: f64 = 1e-3;
/// 百分比 → 相对值
const PERCENT: f64 = 1e-2;

/// 由命令行参数装配模拟器
pub fn build_simulator(
    args: &GeometryArgs,
    jobs: usize,
    show_progress: bool,
) -> Result<Simulator> {
    let wavelength = resolve_wavelength(args)?;

    let mut crystal_config = crystal_config(args)?;
    if let Some(path) = &args.mat {
        crystal_config.orientation = Some(mosflm::read_mosflm_matrix(path, wavelength)?);
        output::print_info(&format!("Orientation from '{}'", path.display()));
    }
    let table = load_structure_factors(args)?;
    if table.is_none() {
        output::print_info(&format!(
            "No structure factor table; all reflections use F = {}",
            args.default_f
        ));
    }

    let detector = Detector::new(detector_config(args)?)?;
    let crystal = Crystal::new(crystal_config, table)?;
    let beam = beam_config(args, wavelength)?;

    let sources = match &args.sourcefile {
        Some(path) => Some(sourcefile::read_sourcefile(
            path,
            wavelength,
            args.source_distance,
            &detector.beam_vector(),
        )?),
        None => None,
    };

    let options = SimulationOptions {
        oversample_omega: args.oversample_omega,
        oversample_polar: args.oversample_polar,
        oversample_thick: args.oversample_thick,
        dmin_a: args.dmin.unwrap_or(0.0),
        jobs,
        show_progress,
    };

    Simulator::new(crystal, detector, &beam, sources, options)
}

// ─────────────────────────────────────────────────────────────
// 配置换算
// ─────────────────────────────────────────────────────────────

/// 波长 (Å)：--lambda 优先，其次 --energy，默认 1 Å
pub fn resolve_wavelength(args: &GeometryArgs) -> Result<f64> {
    let wavelength = match (args.lambda, args.energy) {
        (Some(lambda), _) => lambda,
        (None, Some(ev)) => {
            if !(ev > 0.0) {
                return Err(SimError::InvalidArgument(format!(
                    "photon energy must be positive, got {} eV",
                    ev
                )));
            }
            energy_to_wavelength(ev)
        }
        (None, None) => 1.0,
    };
    if !(wavelength > 0.0) {
        return Err(SimError::InvalidArgument(format!(
            "wavelength must be positive, got {} Å",
            wavelength
        )));
    }
    Ok(wavelength)
}

/// 1 或 3 个值展开为三元组
fn per_axis<T: Copy>(values: &[T], name: &str) -> Result<[T; 3]> {
    match values {
        [v] => Ok([*v, *v, *v]),
        [a, b, c] => Ok([*a, *b, *c]),
        _ => Err(SimError::InvalidArgument(format!(
            "--{} takes one or three values",
            name
        ))),
    }
}

/// 可选的三维向量参数
fn vector_arg(values: &Option<Vec<f64>>, name: &str) -> Result<Option<Vec3>> {
    values
        .as_deref()
        .map(|v| {
            <[f64; 3]>::try_from(v).map_err(|_| {
                SimError::InvalidArgument(format!("--{} takes three values", name))
            })
        })
        .transpose()
}

/// 可选的 (慢轴, 快轴) 参数
fn pair_arg(values: &Option<Vec<f64>>, name: &str) -> Result<Option<(f64, f64)>> {
    match values.as_deref() {
        None => Ok(None),
        Some([s, f]) => Ok(Some((*s, *f))),
        Some(_) => Err(SimError::InvalidArgument(format!(
            "--{} takes two values",
            name
        ))),
    }
}

/// 晶体配置
pub fn crystal_config(args: &GeometryArgs) -> Result<CrystalConfig> {
    let [a, b, c, alpha, beta, gamma] = <[f64; 6]>::try_from(args.cell.as_slice())
        .map_err(|_| SimError::InvalidArgument("--cell takes six values".to_string()))?;

    let misset = if args.random_misset {
        Some(Misset::Random)
    } else {
        vector_arg(&args.misset, "misset")?.map(Misset::Angles)
    };

    let interpolate = match (args.interpolate, args.no_interpolate) {
        (true, _) => Some(true),
        (false, true) => Some(false),
        (false, false) => None,
    };

    Ok(CrystalConfig {
        cell_a: a,
        cell_b: b,
        cell_c: c,
        cell_alpha: alpha,
        cell_beta: beta,
        cell_gamma: gamma,
        n_cells: per_axis(&args.ncells, "ncells")?,
        crystal_size_mm: args
            .xtal_size
            .as_deref()
            .map(|v| per_axis(v, "xtal-size"))
            .transpose()?,
        shape: args.shape.into(),
        fudge: args.fudge,
        misset,
        misset_seed: args.misset_seed,
        orientation: None,
        default_f: args.default_f,
        interpolate,
        phi_start_deg: args.phi,
        osc_range_deg: args.osc,
        phi_steps: args.phisteps,
        spindle_axis: vector_arg(&args.spindle_axis, "spindle-axis")?,
        mosaic_spread_deg: args.mosaic,
        mosaic_domains: args.mosaic_domains,
        mosaic_seed: args.mosaic_seed,
    })
}

/// 探测器配置
pub fn detector_config(args: &GeometryArgs) -> Result<DetectorConfig> {
    let base = DetectorConfig {
        spixels: args.detpixels_s.unwrap_or(args.detpixels),
        fpixels: args.detpixels_f.unwrap_or(args.detpixels),
        pixel_size_mm: args.pixel,
        ..DetectorConfig::default()
    }
    .centered();

    let (mut center_s, mut center_f) = (base.beam_center_s_mm, base.beam_center_f_mm);
    if let Some((s, f)) = pair_arg(&args.beam_center, "beam-center")? {
        center_s = s;
        center_f = f;
    }
    if let Some(orgx) = args.orgx {
        center_f = orgx * args.pixel;
    }
    if let Some(orgy) = args.orgy {
        center_s = orgy * args.pixel;
    }

    let config = DetectorConfig {
        distance_mm: args.distance,
        close_distance_mm: args.close_distance,
        beam_center_s_mm: center_s,
        beam_center_f_mm: center_f,
        close_center_mm: pair_arg(&args.close_center, "close-center")?,
        rotx_deg: args.rotx,
        roty_deg: args.roty,
        rotz_deg: args.rotz,
        twotheta_deg: args.twotheta,
        twotheta_axis: vector_arg(&args.twotheta_axis, "twotheta-axis")?,
        convention: args.convention.into(),
        pivot: args.pivot.map(Into::into),
        fdet_vector: vector_arg(&args.fdet_vector, "fdet-vector")?,
        sdet_vector: vector_arg(&args.sdet_vector, "sdet-vector")?,
        odet_vector: vector_arg(&args.odet_vector, "odet-vector")?,
        beam_vector: vector_arg(&args.beam_vector, "beam-vector")?,
        pix0_vector_mm: vector_arg(&args.pix0_vector, "pix0-vector")?,
        oversample: args.oversample,
        point_pixel: args.point_pixel,
        thickness_um: args.thick,
        attenuation_length_um: args.atten,
        thick_steps: args.thicksteps,
        ..base
    };
    Ok(config)
}

/// 通量密度：--fluence 优先，其次 flux·exposure/beamsize²
fn resolve_fluence(args: &GeometryArgs) -> Result<f64> {
    if let Some(fluence) = args.fluence {
        return Ok(fluence);
    }
    match (args.flux, args.exposure, args.beamsize) {
        (Some(flux), Some(exposure), Some(beamsize_mm)) => {
            if !(beamsize_mm > 0.0) {
                return Err(SimError::InvalidArgument(
                    "beam size must be positive".to_string(),
                ));
            }
            let crystal_m = args
                .xtal_size
                .as_deref()
                .map(|v| v.iter().cloned().fold(0.0, f64::max) * 1e-3)
                .unwrap_or(0.0);
            Ok(fluence_from_flux(flux, exposure, beamsize_mm * 1e-3, crystal_m))
        }
        _ => Ok(DEFAULT_FLUENCE),
    }
}

/// 光束配置
pub fn beam_config(args: &GeometryArgs, wavelength: f64) -> Result<BeamConfig> {
    let scaled = |v: Option<f64>, factor: f64| v.map(|x| x * factor);

    Ok(BeamConfig {
        wavelength_a: wavelength,
        fluence: resolve_fluence(args)?,
        polarization_kahn: args.polar,
        nopolar: args.nopolar,
        polarization_axis: vector_arg(&args.polar_axis, "polar-axis")?,
        source_distance_m: args.source_distance,
        hdiv: SamplingRequest {
            count: args.hdivsteps,
            range: scaled(args.hdivrange, MRAD),
            step: scaled(args.hdivstep, MRAD),
        },
        vdiv: SamplingRequest {
            count: args.vdivsteps,
            range: scaled(args.vdivrange, MRAD),
            step: scaled(args.vdivstep, MRAD),
        },
        dispersion: SamplingRequest {
            count: args.dispsteps,
            range: scaled(args.dispersion, PERCENT),
            step: scaled(args.dispstep, PERCENT),
        },
        round_div: !args.square_div,
    })
}

// ─────────────────────────────────────────────────────────────
// 结构因子
// ─────────────────────────────────────────────────────────────

/// 读取结构因子表
///
/// 给出 HKL 文本时读取并写出 Fdump；否则 Fdump 存在时读取 Fdump。
pub fn load_structure_factors(args: &GeometryArgs) -> Result<Option<HklTable>> {
    if let Some(path) = &args.hkl {
        if !path.is_file() {
            return Err(SimError::FileNotFound {
                path: path.display().to_string(),
            });
        }
        let table = with_spinner(&format!("Reading '{}'", path.display()), || {
            hkl::read_hkl_file(path, args.default_f)
        })?;
        output::print_success(&format!(
            "Loaded {} reflections from '{}'",
            table.populated(),
            path.display()
        ));

        if let Some(dump) = &args.fdump {
            hkl::write_fdump(&table, dump)?;
            output::print_saved("Structure factor cache", dump);
        }
        return Ok(Some(table));
    }

    match &args.fdump {
        Some(dump) if dump.exists() => {
            let table = read_fdump_logged(dump)?;
            Ok(Some(table))
        }
        Some(dump) => {
            output::print_skip(&format!("Fdump '{}' not found", dump.display()));
            Ok(None)
        }
        None => Ok(None),
    }
}

fn read_fdump_logged(path: &Path) -> Result<HklTable> {
    let table = with_spinner(&format!("Reading '{}'", path.display()), || {
        hkl::read_fdump(path)
    })?;
    output::print_success(&format!(
        "Loaded {} grid points from '{}'",
        table.data().len(),
        path.display()
    ));
    Ok(table)
}

fn with_spinner<T>(message: &str, task: impl FnOnce() -> Result<T>) -> Result<T> {
    let spinner = progress::create_spinner(message);
    let result = task();
    spinner.finish_and_clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use crate::models::{DetectorConvention, DetectorPivot};
    use clap::Parser;

    fn geometry(extra: &[&str]) -> GeometryArgs {
        let mut argv = vec!["braggsim", "inspect"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Inspect(args) => args.geometry,
            Commands::Simulate(args) => args.geometry,
        }
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let args = geometry(&[]);
        let crystal = crystal_config(&args).unwrap();
        let detector = detector_config(&args).unwrap();
        let beam = beam_config(&args, 1.0).unwrap();

        assert_eq!(crystal.n_cells, [5, 5, 5]);
        assert_eq!(crystal.cell_gamma, 90.0);
        assert_eq!(detector.spixels, 1024);
        assert!((detector.beam_center_f_mm - 51.2).abs() < 1e-12);
        assert_eq!(detector.convention, DetectorConvention::Mosflm);
        assert_eq!(detector.pivot, None);
        assert!(!beam.hdiv.is_set());
        assert!(beam.round_div);
        assert_eq!(beam.fluence, DEFAULT_FLUENCE);
    }

    #[test]
    fn test_unit_conversions() {
        let args = geometry(&[
            "--hdivrange", "2", "--hdivsteps", "3", "--dispersion", "1", "--energy", "12398.42",
        ]);
        let wavelength = resolve_wavelength(&args).unwrap();
        assert!((wavelength - 1.0).abs() < 1e-9);

        let beam = beam_config(&args, wavelength).unwrap();
        assert!((beam.hdiv.range.unwrap() - 2e-3).abs() < 1e-15);
        assert_eq!(beam.hdiv.count, Some(3));
        assert!((beam.dispersion.range.unwrap() - 0.01).abs() < 1e-15);
    }

    #[test]
    fn test_orgx_orgy_and_isotropic_cells() {
        let args = geometry(&[
            "--detpixels", "100", "--pixel", "0.2", "--orgx", "40", "--orgy", "60", "--ncells", "7",
            "--pivot", "sample",
        ]);
        let detector = detector_config(&args).unwrap();
        assert!((detector.beam_center_f_mm - 8.0).abs() < 1e-12);
        assert!((detector.beam_center_s_mm - 12.0).abs() < 1e-12);
        assert_eq!(detector.pivot, Some(DetectorPivot::Sample));

        let crystal = crystal_config(&args).unwrap();
        assert_eq!(crystal.n_cells, [7, 7, 7]);
    }

    #[test]
    fn test_flux_fluence() {
        let args = geometry(&["--flux", "1e12", "--exposure", "1", "--beamsize", "0.1"]);
        let beam = beam_config(&args, 1.0).unwrap();
        assert!((beam.fluence - 1e12 / 1e-8).abs() / beam.fluence < 1e-12);
    }

    #[test]
    fn test_random_misset_and_interpolation_override() {
        let args = geometry(&["--random-misset", "--no-interpolate"]);
        let crystal = crystal_config(&args).unwrap();
        assert_eq!(crystal.misset, Some(Misset::Random));
        assert_eq!(crystal.interpolate, Some(false));
    }

    #[test]
    fn test_build_small_simulator() {
        let args = geometry(&["--detpixels", "8", "--default-f", "100"]);
        let sim = build_simulator(&args, 1, false).unwrap();
        assert_eq!(sim.detector().shape(), (8, 8));
        assert_eq!(sim.sources().len(), 1);
    }

    #[test]
    fn test_hkl_writes_fdump_then_fdump_is_read() {
        let dir = std::env::temp_dir();
        let tag = std::process::id();
        let hkl_path = dir.join(format!("braggsim_{}_setup.hkl", tag));
        let dump_path = dir.join(format!("braggsim_{}_setup.Fdump", tag));
        std::fs::write(&hkl_path, "0 0 0 10\n1 0 0 20\n").unwrap();

        let args = geometry(&[
            "--hkl",
            hkl_path.to_str().unwrap(),
            "--fdump",
            dump_path.to_str().unwrap(),
        ]);
        let table = load_structure_factors(&args).unwrap().unwrap();
        assert_eq!(table.get(1, 0, 0), Some(20.0));

        let args = geometry(&["--fdump", dump_path.to_str().unwrap()]);
        let cached = load_structure_factors(&args).unwrap().unwrap();
        assert_eq!(cached.bounds(), table.bounds());
        assert_eq!(cached.get(0, 0, 0), Some(10.0));

        std::fs::remove_file(&hkl_path).ok();
        std::fs::remove_file(&dump_path).ok();
    }

    #[test]
    fn test_missing_hkl_file() {
        let args = geometry(&["--hkl", "/nonexistent/braggsim.hkl"]);
        assert!(matches!(
            load_structure_factors(&args),
            Err(SimError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_invalid_wavelength() {
        let args = geometry(&["--lambda", "0"]);
        assert!(resolve_wavelength(&args).is_err());
    }
}
