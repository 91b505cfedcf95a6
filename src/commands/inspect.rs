//! # inspect 子命令实现
//!
//! 打印晶胞张量、探测器基矢、光源列表，可选追踪单个像素的全部子路径。
//!
//! ## 依赖关系
//! - 使用 `cli/inspect.rs` 定义的 InspectArgs
//! - 使用 `commands/setup.rs` 构造模拟器
//! - 使用 `tabled` 输出表格

use crate::batch::Pixel;
use crate::cli::inspect::InspectArgs;
use crate::commands::setup;
use crate::error::{Result, SimError};
use crate::physics::units::angstrom_to_mm;
use crate::physics::vector::Vec3;
use crate::simulator::{PixelTrace, Simulator};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 向量表行
#[derive(Debug, Clone, Tabled)]
struct VectorRow {
    #[tabled(rename = "Vector")]
    name: String,
    #[tabled(rename = "x")]
    x: String,
    #[tabled(rename = "y")]
    y: String,
    #[tabled(rename = "z")]
    z: String,
    #[tabled(rename = "Length")]
    length: String,
}

/// 光源表行
#[derive(Debug, Clone, Tabled)]
struct SourceRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Direction")]
    direction: String,
    #[tabled(rename = "λ (Å)")]
    wavelength: String,
    #[tabled(rename = "Weight")]
    weight: String,
}

/// 追踪表行
#[derive(Debug, Clone, Tabled)]
struct TraceRow {
    #[tabled(rename = "Sub")]
    subpixel: String,
    #[tabled(rename = "Src")]
    source: usize,
    #[tabled(rename = "Phi")]
    phi: usize,
    #[tabled(rename = "Mos")]
    mosaic: usize,
    #[tabled(rename = "h k l")]
    hkl: String,
    #[tabled(rename = "F_cell")]
    f_cell: String,
    #[tabled(rename = "F_latt")]
    f_latt: String,
    #[tabled(rename = "|F|²")]
    intensity: String,
}

/// 执行 inspect
pub fn execute(args: InspectArgs) -> Result<()> {
    output::print_header("Simulation Geometry");

    let simulator = setup::build_simulator(&args.geometry, 1, false)?;

    print_cell(&simulator);
    print_detector(&simulator);
    print_sources(&simulator, args.max_sources);

    if let Some(trace) = &args.trace {
        let pixel = match trace.as_slice() {
            [slow, fast] => Pixel::new(*slow, *fast),
            _ => {
                return Err(SimError::InvalidArgument(
                    "--trace takes two values".to_string(),
                ))
            }
        };
        let trace = simulator.trace_pixel(pixel)?;
        print_trace(&trace, args.max_entries);
    }

    output::print_done("Inspection complete");
    Ok(())
}

fn vector_row(name: &str, v: &Vec3, precision: usize) -> VectorRow {
    let length = (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt();
    VectorRow {
        name: name.to_string(),
        x: format!("{:.*}", precision, v[0]),
        y: format!("{:.*}", precision, v[1]),
        z: format!("{:.*}", precision, v[2]),
        length: format!("{:.*}", precision, length),
    }
}

fn print_cell(simulator: &Simulator) {
    let crystal = simulator.crystal();
    let tensors = crystal.tensors();
    let [a, b, c, alpha, beta, gamma] = tensors.cell;
    let n = crystal.cells();
    let real = crystal.real_vectors();
    let reciprocal = crystal.reciprocal_vectors();

    output::print_header("Unit Cell");
    output::print_info(&format!(
        "a={:.4} b={:.4} c={:.4} Å  α={:.4} β={:.4} γ={:.4}°",
        a, b, c, alpha, beta, gamma
    ));
    output::print_info(&format!(
        "V={:.4} Å³  V*={:.6e} Å⁻³  N=({}, {}, {})",
        tensors.volume, tensors.volume_star, n[0], n[1], n[2]
    ));
    output::print_info(&format!(
        "Reciprocal angles: α*={:.4} β*={:.4} γ*={:.4}°",
        tensors.reciprocal_angles[0], tensors.reciprocal_angles[1], tensors.reciprocal_angles[2]
    ));

    let rows = vec![
        vector_row("a", &real[0], 4),
        vector_row("b", &real[1], 4),
        vector_row("c", &real[2], 4),
        vector_row("a*", &reciprocal[0], 6),
        vector_row("b*", &reciprocal[1], 6),
        vector_row("c*", &reciprocal[2], 6),
    ];
    println!("{}", Table::new(&rows));
}

fn print_detector(simulator: &Simulator) {
    let detector = simulator.detector();
    let (ns, nf) = detector.shape();
    let (sbeam, fbeam) = detector.beam_center_mm();

    output::print_header("Detector");
    output::print_info(&format!(
        "{}x{} pixels of {:.4} mm, {} convention, {} pivot",
        nf,
        ns,
        angstrom_to_mm(detector.pixel_size()),
        detector.convention(),
        detector.pivot()
    ));
    output::print_info(&format!(
        "Sbeam={:.4} mm  Fbeam={:.4} mm  close distance={:.4} mm",
        sbeam,
        fbeam,
        angstrom_to_mm(detector.close_distance())
    ));
    output::print_info(&format!(
        "Oversample {}, {} thickness layer(s)",
        detector.oversample(),
        detector.thick_layers()
    ));

    let pix0 = detector.pix0_vector().map(angstrom_to_mm);
    let rows = vec![
        vector_row("fdet", &detector.fdet(), 6),
        vector_row("sdet", &detector.sdet(), 6),
        vector_row("odet", &detector.odet(), 6),
        vector_row("beam", &detector.beam_vector(), 6),
        vector_row("pix0 (mm)", &pix0, 6),
        vector_row("spindle", &simulator.spindle_axis(), 6),
        vector_row("polarization", &simulator.polarization_axis(), 6),
    ];
    println!("{}", Table::new(&rows));
}

fn print_sources(simulator: &Simulator, max_sources: usize) {
    let sources = simulator.sources();
    output::print_header(&format!("Sources ({})", sources.len()));

    let rows: Vec<SourceRow> = sources
        .iter()
        .take(max_sources)
        .enumerate()
        .map(|(i, s)| SourceRow {
            index: i,
            direction: format!(
                "({:.6}, {:.6}, {:.6})",
                s.direction[0], s.direction[1], s.direction[2]
            ),
            wavelength: format!("{:.6}", s.wavelength),
            weight: format!("{:.3}", s.weight),
        })
        .collect();
    println!("{}", Table::new(&rows));

    if sources.len() > max_sources {
        output::print_skip(&format!("{} more sources not shown", sources.len() - max_sources));
    }
    output::print_info(&format!("Steps per pixel: {}", simulator.steps()));
}

/// 分辨率截断的子路径显示为 "cut"
fn or_cut(value: Option<f64>, format: impl Fn(f64) -> String) -> String {
    value.map(format).unwrap_or_else(|| "cut".to_string())
}

fn print_trace(trace: &PixelTrace, max_entries: usize) {
    output::print_header(&format!(
        "Trace of pixel ({}, {})",
        trace.pixel.slow, trace.pixel.fast
    ));
    let pos = trace.position.map(angstrom_to_mm);
    output::print_info(&format!(
        "Position ({:.4}, {:.4}, {:.4}) mm",
        pos[0], pos[1], pos[2]
    ));
    output::print_info(&format!(
        "Ω={:.6e} sr  polarization={:.6}  capture={:.6}",
        trace.solid_angle, trace.polarization, trace.capture_fraction
    ));

    let rows: Vec<TraceRow> = trace
        .entries
        .iter()
        .take(max_entries)
        .map(|e| TraceRow {
            subpixel: format!("{},{}", e.subpixel.0, e.subpixel.1),
            source: e.source,
            phi: e.phi,
            mosaic: e.mosaic,
            hkl: format!("{:.3} {:.3} {:.3}", e.hkl[0], e.hkl[1], e.hkl[2]),
            f_cell: or_cut(e.f_cell, |v| format!("{:.4}", v)),
            f_latt: or_cut(e.f_latt, |v| format!("{:.4}", v)),
            intensity: or_cut(e.intensity, |v| format!("{:.6e}", v)),
        })
        .collect();
    println!("{}", Table::new(&rows));

    if trace.entries.len() > max_entries {
        output::print_skip(&format!(
            "{} more sub-paths not shown",
            trace.entries.len() - max_entries
        ));
    }
    output::print_success(&format!("Pixel intensity: {:.6e}", trace.intensity));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Commands};
    use clap::Parser;

    fn inspect_args(extra: &[&str]) -> InspectArgs {
        let mut argv = vec!["braggsim", "inspect"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Commands::Inspect(args) => args,
            Commands::Simulate(_) => panic!("expected inspect"),
        }
    }

    #[test]
    fn test_vector_row_length() {
        let row = vector_row("a", &[3.0, 4.0, 0.0], 2);
        assert_eq!(row.length, "5.00");
        assert_eq!(row.x, "3.00");
    }

    #[test]
    fn test_cut_entries_are_labelled() {
        assert_eq!(or_cut(None, |v| v.to_string()), "cut");
        assert_eq!(or_cut(Some(1.5), |v| format!("{:.2}", v)), "1.50");
    }

    #[test]
    fn test_execute_with_trace() {
        let args = inspect_args(&["--detpixels", "8", "--default-f", "10", "--trace", "4", "4"]);
        execute(args).unwrap();
    }

    #[test]
    fn test_trace_outside_detector() {
        let args = inspect_args(&["--detpixels", "8", "--trace", "8", "0"]);
        assert!(execute(args).is_err());
    }
}
