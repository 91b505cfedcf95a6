//! # 单位换算与物理常数
//!
//! 内部长度统一使用 Å，角度使用弧度。
//!
//! ## 依赖关系
//! - 被 `models/`、`sampling/`、`simulator/`、`commands/` 使用

/// 经典电子半径平方 (m²)
pub const R_E_SQR: f64 = 7.94079248018965e-30;

/// 默认通量密度 (photons/m²)，满足 r_e² · fluence ≈ 1
pub const DEFAULT_FLUENCE: f64 = 1.25932015286227e29;

/// hc (eV·Å)
pub const HC_EV_ANGSTROM: f64 = 12398.42;

/// 毫米转 Å
pub fn mm_to_angstrom(mm: f64) -> f64 {
    mm * 1e7
}

/// 米转 Å
pub fn m_to_angstrom(m: f64) -> f64 {
    m * 1e10
}

/// 微米转 Å
pub fn um_to_angstrom(um: f64) -> f64 {
    um * 1e4
}

/// Å 转米
pub fn angstrom_to_m(a: f64) -> f64 {
    a * 1e-10
}

/// Å 转毫米
pub fn angstrom_to_mm(a: f64) -> f64 {
    a * 1e-7
}

/// 光子能量 (eV) 转波长 (Å)
pub fn energy_to_wavelength(ev: f64) -> f64 {
    HC_EV_ANGSTROM / ev
}

/// 由通量、曝光时间和光斑尺寸计算通量密度 (photons/m²)
///
/// 光斑小于晶体尺寸时以晶体尺寸为准。
pub fn fluence_from_flux(flux: f64, exposure: f64, beamsize_m: f64, crystal_size_m: f64) -> f64 {
    let size = if crystal_size_m > 0.0 && beamsize_m < crystal_size_m {
        crystal_size_m
    } else {
        beamsize_m
    };
    flux * exposure / (size * size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_fluence_normalizes_thomson() {
        assert!((R_E_SQR * DEFAULT_FLUENCE - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_length_conversions() {
        assert_eq!(mm_to_angstrom(0.1), 1e6);
        assert_eq!(m_to_angstrom(10.0), 1e11);
        assert!((angstrom_to_mm(mm_to_angstrom(51.2)) - 51.2).abs() < 1e-12);
    }

    #[test]
    fn test_energy_to_wavelength() {
        assert!((energy_to_wavelength(12398.42) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_fluence_uses_crystal_when_beam_smaller() {
        let f = fluence_from_flux(1e12, 1.0, 1e-5, 1e-4);
        assert!((f - 1e12 / 1e-8).abs() / f < 1e-12);
    }
}
