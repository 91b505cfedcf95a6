//! # 四点 Lagrange 插值
//!
//! 结构因子三三次插值的基础：一维 `polint`，二维 `polin2`，三维 `polin3`。
//! 每一维使用 4 个等距或非等距节点。
//!
//! ## 依赖关系
//! - 被 `models/structure_factor.rs` 调用

/// 一维四点 Lagrange 插值
pub fn polint(xa: &[f64; 4], ya: &[f64; 4], x: f64) -> f64 {
    let mut y = 0.0;
    for i in 0..4 {
        let mut term = ya[i];
        for j in 0..4 {
            if i != j {
                term *= (x - xa[j]) / (xa[i] - xa[j]);
            }
        }
        y += term;
    }
    y
}

/// 二维插值：先沿第二维，再沿第一维
pub fn polin2(x1a: &[f64; 4], x2a: &[f64; 4], ya: &[[f64; 4]; 4], x1: f64, x2: f64) -> f64 {
    let mut ymtmp = [0.0; 4];
    for (slot, row) in ymtmp.iter_mut().zip(ya.iter()) {
        *slot = polint(x2a, row, x2);
    }
    polint(x1a, &ymtmp, x1)
}

/// 三维插值：对每个 h 切片做二维插值，再沿 h 插值
pub fn polin3(
    x1a: &[f64; 4],
    x2a: &[f64; 4],
    x3a: &[f64; 4],
    ya: &[[[f64; 4]; 4]; 4],
    x1: f64,
    x2: f64,
    x3: f64,
) -> f64 {
    let mut ymtmp = [0.0; 4];
    for (slot, plane) in ymtmp.iter_mut().zip(ya.iter()) {
        *slot = polin2(x2a, x3a, plane, x2, x3);
    }
    polint(x1a, &ymtmp, x1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: [f64; 4] = [-1.0, 0.0, 1.0, 2.0];

    #[test]
    fn test_polint_reproduces_cubic() {
        let f = |x: f64| 2.0 * x * x * x - x * x + 0.5 * x - 3.0;
        let ya = NODES.map(f);
        for x in [-0.7, 0.25, 1.5] {
            assert!((polint(&NODES, &ya, x) - f(x)).abs() < 1e-12);
        }
    }

    #[test]
    fn test_polint_hits_nodes() {
        let ya = [4.0, -1.0, 7.0, 0.5];
        for i in 0..4 {
            assert!((polint(&NODES, &ya, NODES[i]) - ya[i]).abs() < 1e-12);
        }
    }

    #[test]
    fn test_polin3_trilinear_field() {
        let f = |h: f64, k: f64, l: f64| 1.0 + 2.0 * h - 0.5 * k + 3.0 * l + h * k * l;
        let mut ya = [[[0.0; 4]; 4]; 4];
        for (i, plane) in ya.iter_mut().enumerate() {
            for (j, row) in plane.iter_mut().enumerate() {
                for (k, cell) in row.iter_mut().enumerate() {
                    *cell = f(NODES[i], NODES[j], NODES[k]);
                }
            }
        }
        let value = polin3(&NODES, &NODES, &NODES, &ya, 0.3, 0.6, -0.2);
        assert!((value - f(0.3, 0.6, -0.2)).abs() < 1e-10);
    }
}
