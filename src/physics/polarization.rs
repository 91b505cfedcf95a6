//! # 偏振因子
//!
//! Kahn 偏振校正：`0.5·(1 + cos²2θ − K·cos(2ψ)·sin²2θ)`，
//! ψ 为衍射方向在入射 E-B 平面上的投影角。
//!
//! ## 依赖关系
//! - 被 `simulator/engine.rs` 调用
//! - 使用 `physics/vector.rs`

use crate::physics::vector::{cross, dot, unitize, Vec3};

/// 计算偏振因子
///
/// `axis` 为入射光偏振（E 矢量）参考方向。三个向量均在内部单位化。
pub fn polarization_factor(kahn: f64, incident: &Vec3, diffracted: &Vec3, axis: &Vec3) -> f64 {
    let (incident, _) = unitize(incident);
    let (diffracted, _) = unitize(diffracted);
    let (axis, _) = unitize(axis);

    let cos2theta = dot(&incident, &diffracted);
    let cos2theta_sqr = cos2theta * cos2theta;
    let sin2theta_sqr = 1.0 - cos2theta_sqr;

    let mut psi = 0.0;
    if kahn != 0.0 {
        let (b_in, _) = unitize(&cross(&axis, &incident));
        let (e_in, _) = unitize(&cross(&incident, &b_in));
        psi = -dot(&diffracted, &b_in).atan2(dot(&diffracted, &e_in));
    }

    0.5 * (1.0 + cos2theta_sqr - kahn * (2.0 * psi).cos() * sin2theta_sqr)
}
