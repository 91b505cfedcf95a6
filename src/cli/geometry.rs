//! # 共享几何参数
//!
//! `simulate` 与 `inspect` 共用的晶体、探测器、光束参数组，通过
//! `#[command(flatten)]` 嵌入两个子命令。
//!
//! 命令行单位沿用常见衍射软件的习惯：发散角 mrad，色散百分比，
//! 探测器 mm，厚度 µm。换算到内部配置在 `commands/setup.rs` 完成。
//!
//! ## 依赖关系
//! - 被 `cli/simulate.rs`、`cli/inspect.rs` 使用
//! - 枚举转换到 `models/config.rs` 的配置类型

use crate::models::{CrystalShape, DetectorConvention, DetectorPivot};

use clap::{Args, ValueEnum};
use std::path::PathBuf;

// ─────────────────────────────────────────────────────────────
// 枚举参数
// ─────────────────────────────────────────────────────────────

/// 探测器几何约定
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ConventionArg {
    /// MOSFLM (beam along +x)
    Mosflm,
    /// XDS (beam along +z)
    Xds,
    /// DENZO (MOSFLM axes, no half-pixel offset)
    Denzo,
    /// DIALS (beam along +z, spindle along +y)
    Dials,
    /// ADXV (slow axis along -y)
    Adxv,
    /// User supplied basis vectors
    Custom,
}

impl std::fmt::Display for ConventionArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DetectorConvention::from(*self))
    }
}

impl From<ConventionArg> for DetectorConvention {
    fn from(arg: ConventionArg) -> Self {
        match arg {
            ConventionArg::Mosflm => DetectorConvention::Mosflm,
            ConventionArg::Xds => DetectorConvention::Xds,
            ConventionArg::Denzo => DetectorConvention::Denzo,
            ConventionArg::Dials => DetectorConvention::Dials,
            ConventionArg::Adxv => DetectorConvention::Adxv,
            ConventionArg::Custom => DetectorConvention::Custom,
        }
    }
}

/// 探测器旋转枢轴
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum PivotArg {
    /// Rotate about the direct-beam spot
    Beam,
    /// Rotate about the sample position
    Sample,
}

impl std::fmt::Display for PivotArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DetectorPivot::from(*self))
    }
}

impl From<PivotArg> for DetectorPivot {
    fn from(arg: PivotArg) -> Self {
        match arg {
            PivotArg::Beam => DetectorPivot::Beam,
            PivotArg::Sample => DetectorPivot::Sample,
        }
    }
}

/// 晶体形状模型
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ShapeArg {
    /// Parallelepiped (sincg)
    Square,
    /// Sphere (sinc3)
    Round,
    /// Gaussian
    Gauss,
    /// Truncated sphere
    Tophat,
}

impl std::fmt::Display for ShapeArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", CrystalShape::from(*self))
    }
}

impl From<ShapeArg> for CrystalShape {
    fn from(arg: ShapeArg) -> Self {
        match arg {
            ShapeArg::Square => CrystalShape::Square,
            ShapeArg::Round => CrystalShape::Round,
            ShapeArg::Gauss => CrystalShape::Gauss,
            ShapeArg::Tophat => CrystalShape::Tophat,
        }
    }
}

// ─────────────────────────────────────────────────────────────
// 参数组
// ─────────────────────────────────────────────────────────────

/// 晶体、探测器、光束的全部几何参数
#[derive(Args, Debug)]
pub struct GeometryArgs {
    // ── 晶体 ──
    /// Unit cell: a b c (Å) alpha beta gamma (degrees)
    #[arg(
        long,
        num_args = 6,
        value_names = ["A", "B", "C", "ALPHA", "BETA", "GAMMA"],
        default_values_t = [100.0, 100.0, 100.0, 90.0, 90.0, 90.0]
    )]
    pub cell: Vec<f64>,

    /// MOSFLM orientation matrix file (overrides --cell)
    #[arg(long)]
    pub mat: Option<PathBuf>,

    /// Structure factor text file (h k l F per line)
    #[arg(long)]
    pub hkl: Option<PathBuf>,

    /// Binary structure factor cache; written after --hkl, read when --hkl is absent
    #[arg(long)]
    pub fdump: Option<PathBuf>,

    /// Structure factor for reflections missing from the table
    #[arg(long, default_value_t = 0.0)]
    pub default_f: f64,

    /// Unit cells per crystal axis (one value for isotropic)
    #[arg(long, num_args = 1..=3, value_name = "N", default_values_t = [5, 5, 5])]
    pub ncells: Vec<u32>,

    /// Crystal size in mm (one value for isotropic); overrides --ncells
    #[arg(long, num_args = 1..=3, value_name = "MM")]
    pub xtal_size: Option<Vec<f64>>,

    /// Crystal shape model
    #[arg(long, value_enum, default_value_t = ShapeArg::Square)]
    pub shape: ShapeArg,

    /// Shape factor sharpness multiplier
    #[arg(long, default_value_t = 1.0)]
    pub fudge: f64,

    /// Missetting angles about x, y, z (degrees)
    #[arg(long, num_args = 3, value_names = ["RX", "RY", "RZ"], allow_negative_numbers = true)]
    pub misset: Option<Vec<f64>>,

    /// Draw a random missetting orientation from --misset-seed
    #[arg(long, conflicts_with = "misset")]
    pub random_misset: bool,

    /// Seed for the random missetting orientation
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub misset_seed: i64,

    /// Force tricubic interpolation of structure factors
    #[arg(long, conflicts_with = "no_interpolate")]
    pub interpolate: bool,

    /// Disable tricubic interpolation of structure factors
    #[arg(long)]
    pub no_interpolate: bool,

    /// Starting spindle angle (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub phi: f64,

    /// Oscillation range (degrees)
    #[arg(long, default_value_t = 0.0)]
    pub osc: f64,

    /// Number of spindle steps across the oscillation
    #[arg(long, default_value_t = 1)]
    pub phisteps: u32,

    /// Spindle rotation axis (defaults to the convention's axis)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub spindle_axis: Option<Vec<f64>>,

    /// Isotropic mosaic spread (degrees)
    #[arg(long, default_value_t = 0.0)]
    pub mosaic: f64,

    /// Number of mosaic domains
    #[arg(long, default_value_t = 1)]
    pub mosaic_domains: u32,

    /// Seed for the mosaic domain orientations
    #[arg(long, default_value_t = -12345678, allow_negative_numbers = true)]
    pub mosaic_seed: i64,

    // ── 探测器 ──
    /// Detector size in pixels (both axes)
    #[arg(long, default_value_t = 1024)]
    pub detpixels: usize,

    /// Pixels along the fast axis (overrides --detpixels)
    #[arg(long)]
    pub detpixels_f: Option<usize>,

    /// Pixels along the slow axis (overrides --detpixels)
    #[arg(long)]
    pub detpixels_s: Option<usize>,

    /// Pixel size (mm)
    #[arg(long, default_value_t = 0.1)]
    pub pixel: f64,

    /// Sample to detector distance (mm)
    #[arg(long, default_value_t = 100.0)]
    pub distance: f64,

    /// Perpendicular sample to detector distance for SAMPLE pivot (mm)
    #[arg(long)]
    pub close_distance: Option<f64>,

    /// Beam centre on the detector: slow fast (mm); defaults to the detector centre
    #[arg(long, num_args = 2, value_names = ["SLOW_MM", "FAST_MM"], allow_negative_numbers = true)]
    pub beam_center: Option<Vec<f64>>,

    /// XDS ORGX: beam centre along the fast axis (pixels)
    #[arg(long, conflicts_with = "beam_center", allow_negative_numbers = true)]
    pub orgx: Option<f64>,

    /// XDS ORGY: beam centre along the slow axis (pixels)
    #[arg(long, conflicts_with = "beam_center", allow_negative_numbers = true)]
    pub orgy: Option<f64>,

    /// Point of closest approach for SAMPLE pivot: slow fast (mm)
    #[arg(long, num_args = 2, value_names = ["SLOW_MM", "FAST_MM"], allow_negative_numbers = true)]
    pub close_center: Option<Vec<f64>>,

    /// Detector rotation about x (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotx: f64,

    /// Detector rotation about y (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub roty: f64,

    /// Detector rotation about z (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub rotz: f64,

    /// Detector two-theta swing (degrees)
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub twotheta: f64,

    /// Two-theta rotation axis (defaults to the convention's axis)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub twotheta_axis: Option<Vec<f64>>,

    /// Detector geometry convention
    #[arg(long, value_enum, default_value_t = ConventionArg::Mosflm)]
    pub convention: ConventionArg,

    /// Rotation pivot (defaults per convention)
    #[arg(long, value_enum)]
    pub pivot: Option<PivotArg>,

    /// Custom fast-axis vector (implies CUSTOM convention)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub fdet_vector: Option<Vec<f64>>,

    /// Custom slow-axis vector (implies CUSTOM convention)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub sdet_vector: Option<Vec<f64>>,

    /// Custom detector normal (implies CUSTOM convention)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub odet_vector: Option<Vec<f64>>,

    /// Custom beam direction (implies CUSTOM convention)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub beam_vector: Option<Vec<f64>>,

    /// Position of the first pixel corner in mm (implies CUSTOM convention)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub pix0_vector: Option<Vec<f64>>,

    /// Sub-pixel oversampling along each axis
    #[arg(long, default_value_t = 1)]
    pub oversample: u32,

    /// Treat pixels as points (solid angle 1/R²)
    #[arg(long)]
    pub point_pixel: bool,

    /// Sensor thickness (µm); 0 disables absorption
    #[arg(long, default_value_t = 0.0)]
    pub thick: f64,

    /// Sensor attenuation length (µm)
    #[arg(long, default_value_t = 234.0)]
    pub atten: f64,

    /// Number of sensor thickness layers
    #[arg(long)]
    pub thicksteps: Option<u32>,

    // ── 光束 ──
    /// Central wavelength (Å) [default: 1.0]
    #[arg(long, conflicts_with = "energy")]
    pub lambda: Option<f64>,

    /// Photon energy (eV), alternative to --lambda
    #[arg(long)]
    pub energy: Option<f64>,

    /// Incident fluence (photons/m²)
    #[arg(long, conflicts_with = "flux")]
    pub fluence: Option<f64>,

    /// Incident flux (photons/s), used with --exposure and --beamsize
    #[arg(long, requires_all = ["exposure", "beamsize"])]
    pub flux: Option<f64>,

    /// Exposure time (s)
    #[arg(long)]
    pub exposure: Option<f64>,

    /// Beam size (mm)
    #[arg(long)]
    pub beamsize: Option<f64>,

    /// Kahn polarization factor (0 unpolarized, 1 fully polarized)
    #[arg(long, default_value_t = 0.0)]
    pub polar: f64,

    /// Disable the polarization correction
    #[arg(long)]
    pub nopolar: bool,

    /// Polarization reference axis (defaults to the convention's axis)
    #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_negative_numbers = true)]
    pub polar_axis: Option<Vec<f64>>,

    /// Source to sample distance (m)
    #[arg(long, default_value_t = 10.0)]
    pub source_distance: f64,

    /// Explicit source list file (X Y Z weight lambda per line)
    #[arg(long)]
    pub sourcefile: Option<PathBuf>,

    /// Horizontal divergence range (mrad)
    #[arg(long)]
    pub hdivrange: Option<f64>,

    /// Horizontal divergence step (mrad)
    #[arg(long)]
    pub hdivstep: Option<f64>,

    /// Number of horizontal divergence steps
    #[arg(long)]
    pub hdivsteps: Option<u32>,

    /// Vertical divergence range (mrad)
    #[arg(long)]
    pub vdivrange: Option<f64>,

    /// Vertical divergence step (mrad)
    #[arg(long)]
    pub vdivstep: Option<f64>,

    /// Number of vertical divergence steps
    #[arg(long)]
    pub vdivsteps: Option<u32>,

    /// Spectral dispersion, full width (percent)
    #[arg(long)]
    pub dispersion: Option<f64>,

    /// Dispersion step (percent)
    #[arg(long)]
    pub dispstep: Option<f64>,

    /// Number of wavelength steps
    #[arg(long)]
    pub dispsteps: Option<u32>,

    /// Keep the full rectangular divergence grid instead of an ellipse
    #[arg(long)]
    pub square_div: bool,

    // ── 计算选项 ──
    /// Evaluate the solid angle per sub-pixel
    #[arg(long)]
    pub oversample_omega: bool,

    /// Evaluate polarization per sub-pixel and source
    #[arg(long)]
    pub oversample_polar: bool,

    /// Evaluate the absorption per sub-pixel
    #[arg(long)]
    pub oversample_thick: bool,

    /// Resolution cutoff (Å); sub-paths beyond it contribute nothing
    #[arg(long)]
    pub dmin: Option<f64>,
}
