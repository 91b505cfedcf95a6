//! # 三维向量与旋转
//!
//! 以 `[f64; 3]` 表示向量、`[[f64; 3]; 3]` 表示矩阵（行优先）的纯函数集合。
//!
//! ## 功能
//! - 点积、叉积、模长、单位化（带下限截断）
//! - 绕 X/Y/Z 轴的组合旋转（先 X 后 Y 再 Z）
//! - 绕任意轴旋转（Rodrigues 公式）
//! - 矩阵乘法、转置
//!
//! ## 依赖关系
//! - 被 `models/`、`sampling/`、`simulator/` 使用
//! - 无外部模块依赖

/// 三维向量
pub type Vec3 = [f64; 3];

/// 3x3 矩阵，行优先
pub type Mat3 = [[f64; 3]; 3];

/// 单位化时的模长下限
pub const MAGNITUDE_FLOOR: f64 = 1e-12;

/// 单位矩阵
pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// 向量点积
pub fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// 向量叉积
pub fn cross(a: &Vec3, b: &Vec3) -> Vec3 {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

/// 向量模长
pub fn magnitude(v: &Vec3) -> f64 {
    dot(v, v).sqrt()
}

/// 数乘
pub fn scale(v: &Vec3, s: f64) -> Vec3 {
    [v[0] * s, v[1] * s, v[2] * s]
}

/// 向量加法
pub fn add(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] + b[0], a[1] + b[1], a[2] + b[2]]
}

/// 向量减法
pub fn sub(a: &Vec3, b: &Vec3) -> Vec3 {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

/// 单位化，返回 (单位向量, 原模长)
///
/// 模长被截断到 [`MAGNITUDE_FLOOR`] 以上，零向量返回零向量而非 NaN。
pub fn unitize(v: &Vec3) -> (Vec3, f64) {
    let length = magnitude(v);
    let safe = length.max(MAGNITUDE_FLOOR);
    (scale(v, 1.0 / safe), length)
}

/// 矩阵乘向量
pub fn mat_vec(m: &Mat3, v: &Vec3) -> Vec3 {
    [dot(&m[0], v), dot(&m[1], v), dot(&m[2], v)]
}

/// 矩阵乘法
pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut out = [[0.0; 3]; 3];
    for (i, row) in out.iter_mut().enumerate() {
        for (j, cell) in row.iter_mut().enumerate() {
            *cell = (0..3).map(|k| a[i][k] * b[k][j]).sum();
        }
    }
    out
}

/// 矩阵转置
pub fn transpose(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// 组合旋转矩阵 R = Rz · Ry · Rx（弧度）
pub fn rotation_matrix_xyz(rotx: f64, roty: f64, rotz: f64) -> Mat3 {
    let (sx, cx) = rotx.sin_cos();
    let (sy, cy) = roty.sin_cos();
    let (sz, cz) = rotz.sin_cos();

    let rx = [[1.0, 0.0, 0.0], [0.0, cx, -sx], [0.0, sx, cx]];
    let ry = [[cy, 0.0, sy], [0.0, 1.0, 0.0], [-sy, 0.0, cy]];
    let rz = [[cz, -sz, 0.0], [sz, cz, 0.0], [0.0, 0.0, 1.0]];

    mat_mul(&rz, &mat_mul(&ry, &rx))
}

/// 依次绕 X、Y、Z 轴旋转向量（弧度）
pub fn rotate_xyz(v: &Vec3, rotx: f64, roty: f64, rotz: f64) -> Vec3 {
    mat_vec(&rotation_matrix_xyz(rotx, roty, rotz), v)
}

/// 绕任意轴旋转（Rodrigues 公式），轴无需预先单位化
pub fn rotate_axis(v: &Vec3, axis: &Vec3, angle: f64) -> Vec3 {
    let (k, _) = unitize(axis);
    let (sin_a, cos_a) = angle.sin_cos();
    let k_cross_v = cross(&k, v);
    let k_dot_v = dot(&k, v);

    [
        v[0] * cos_a + k_cross_v[0] * sin_a + k[0] * k_dot_v * (1.0 - cos_a),
        v[1] * cos_a + k_cross_v[1] * sin_a + k[1] * k_dot_v * (1.0 - cos_a),
        v[2] * cos_a + k_cross_v[2] * sin_a + k[2] * k_dot_v * (1.0 - cos_a),
    ]
}
