//! # simulate 子命令实现
//!
//! 装配模拟器、选择像素、并行计算图像，然后导出。
//!
//! ## 功能
//! - 整幅 / ROI / 像素列表 / 随机子集
//! - 可选经由 φ 延续缓存
//! - 统计表与最亮像素表（tabled）
//! - 浮点图像、PGM、热图 (PNG/SVG)、CSV、诊断图像
//!
//! ## 依赖关系
//! - 使用 `cli/simulate.rs` 定义的 SimulateArgs
//! - 使用 `commands/setup.rs` 构造模拟器
//! - 使用 `io/` 导出结果

use crate::batch::PixelSelection;
use crate::cli::simulate::SimulateArgs;
use crate::commands::setup;
use crate::error::{Result, SimError};
use crate::io::{export, pixel_list, plot};
use crate::simulator::{ImageStats, PhiCarryoverCache, SimulationOutput, Simulator};
use crate::utils::output;

use std::path::Path;
use tabled::{Table, Tabled};

/// 统计表行
#[derive(Debug, Clone, Tabled)]
struct StatRow {
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// 最亮像素表行
#[derive(Debug, Clone, Tabled)]
struct PeakRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Slow")]
    slow: usize,
    #[tabled(rename = "Fast")]
    fast: usize,
    #[tabled(rename = "Intensity")]
    intensity: String,
}

/// 执行模拟
pub fn execute(args: SimulateArgs) -> Result<()> {
    output::print_header("Diffraction Image Simulation");

    let simulator = setup::build_simulator(&args.geometry, args.jobs, !args.no_progress)?;
    print_setup(&simulator);

    let selection = pixel_selection(&args)?;
    let result = if args.phi_cache {
        let mut cache = PhiCarryoverCache::new(simulator.detector().shape());
        let result = simulator.run_with_cache(&selection, &mut cache)?;
        output::print_info(&format!(
            "Phi cache: {} pixels, {} shared lattice(s)",
            cache.cached_pixels(),
            cache.arena_len()
        ));
        result
    } else {
        simulator.run(&selection)?
    };

    output::print_success(&format!(
        "Evaluated {} pixels in {:.2}s",
        result.pixels.len(),
        result.elapsed.as_secs_f64()
    ));

    let stats = result.stats();
    print_stats(&stats);
    print_peaks(&result, args.top_n);

    write_outputs(&args, &simulator, &result)?;

    output::print_done("Simulation complete");
    Ok(())
}

/// 由参数确定像素选择方式
fn pixel_selection(args: &SimulateArgs) -> Result<PixelSelection> {
    if let Some(roi) = &args.roi {
        return match roi.as_slice() {
            [fmin, fmax, smin, smax] => Ok(PixelSelection::Roi {
                fmin: *fmin,
                fmax: *fmax,
                smin: *smin,
                smax: *smax,
            }),
            _ => Err(SimError::InvalidArgument(
                "--roi takes four values".to_string(),
            )),
        };
    }
    if let Some(path) = &args.pixel_list {
        let pixels = pixel_list::read_pixel_list(path)?;
        output::print_info(&format!(
            "Read {} pixels from '{}'",
            pixels.len(),
            path.display()
        ));
        return Ok(PixelSelection::List(pixels));
    }
    if let Some(count) = args.random_pixels {
        return Ok(PixelSelection::Random {
            count,
            seed: args.seed,
        });
    }
    Ok(PixelSelection::Full)
}

fn print_setup(simulator: &Simulator) {
    let detector = simulator.detector();
    let (ns, nf) = detector.shape();
    let lattice = simulator.rotated_lattice();

    output::print_info(&format!(
        "Detector: {}x{} pixels, {} convention, {} pivot",
        nf,
        ns,
        detector.convention(),
        detector.pivot()
    ));
    output::print_info(&format!(
        "Sources: {}, phi steps: {}, mosaic domains: {}, oversample: {}",
        simulator.sources().len(),
        lattice.phi_steps,
        lattice.mosaic_domains,
        detector.oversample()
    ));
    if simulator.crystal().structure_factors().interpolation_enabled() {
        output::print_info("Tricubic structure factor interpolation enabled");
    }
}

fn print_stats(stats: &ImageStats) {
    let location = stats
        .max_pixel
        .map(|p| format!("({}, {})", p.slow, p.fast))
        .unwrap_or_else(|| "-".to_string());

    let rows = vec![
        StatRow {
            quantity: "Pixels".to_string(),
            value: stats.count.to_string(),
        },
        StatRow {
            quantity: "max_I".to_string(),
            value: format!("{:.6e}", stats.max_i),
        },
        StatRow {
            quantity: "max_I at (slow, fast)".to_string(),
            value: location,
        },
        StatRow {
            quantity: "mean".to_string(),
            value: format!("{:.6e}", stats.mean),
        },
        StatRow {
            quantity: "rms".to_string(),
            value: format!("{:.6e}", stats.rms),
        },
        StatRow {
            quantity: "rmsd".to_string(),
            value: format!("{:.6e}", stats.rmsd),
        },
    ];

    output::print_header("Image Statistics");
    println!("{}", Table::new(&rows));
}

fn print_peaks(result: &SimulationOutput, top_n: usize) {
    if top_n == 0 {
        return;
    }
    let rows: Vec<PeakRow> = export::brightest_pixels(&result.image, &result.pixels, top_n)
        .into_iter()
        .enumerate()
        .map(|(i, (pixel, intensity))| PeakRow {
            rank: i + 1,
            slow: pixel.slow,
            fast: pixel.fast,
            intensity: format!("{:.6e}", intensity),
        })
        .collect();

    output::print_header(&format!("Top {} Pixels", rows.len()));
    println!("{}", Table::new(&rows));
}

/// 写出所有请求的文件
fn write_outputs(args: &SimulateArgs, simulator: &Simulator, result: &SimulationOutput) -> Result<()> {
    export::write_float_image(&result.image, &args.floatfile)?;
    output::print_saved("Float image", &args.floatfile);

    if let Some(path) = &args.pgmfile {
        let scale = export::write_pgm(&result.image, path, args.pgm_scale)?;
        output::print_saved(&format!("PGM image (scale {:.6e})", scale), path);
    }

    if let Some(path) = &args.plot {
        let (ns, nf) = simulator.detector().shape();
        let title = format!("Simulated image {}x{}", nf, ns);
        plot::generate_heatmap(&result.image, path, &title, args.plot_cells, is_svg(path))?;
        output::print_saved("Heat map", path);
    }

    if let Some(path) = &args.top_csv {
        export::top_pixels_to_csv(&result.image, &result.pixels, args.top_n, path)?;
        output::print_saved("Brightest pixels", path);
    }

    if args.omega_file.is_some() || args.capture_file.is_some() {
        let diagnostics = simulator.diagnostics();
        if let Some(path) = &args.omega_file {
            export::write_float_image(&diagnostics.solid_angle, path)?;
            output::print_saved("Solid angle image", path);
        }
        if let Some(path) = &args.capture_file {
            export::write_float_image(&diagnostics.capture_fraction, path)?;
            output::print_saved("Capture fraction image", path);
        }
    }

    Ok(())
}

fn is_svg(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"))
}
