//! # 可复现随机数与随机旋转
//!
//! 最小标准线性同余发生器（Park–Miller）加 Bays–Durham 洗牌表，
//! 与经典 `ran1()` 逐位一致。用于镶嵌块取向和随机 misset。
//!
//! 发生器是显式对象，由配置中的种子构造并逐次推进，不依赖全局状态。
//!
//! ## 依赖关系
//! - 被 `models/crystal.rs` 调用
//! - 使用 `physics/vector.rs`

use crate::physics::vector::{unitize, Mat3};

use std::f64::consts::PI;

const IA: i64 = 16807;
const IM: i64 = 2147483647;
const AM: f64 = 1.0 / IM as f64;
const IQ: i64 = 127773;
const IR: i64 = 2836;
const NTAB: usize = 32;
const NDIV: i64 = 1 + (IM - 1) / NTAB as i64;
const EPS: f64 = 1.2e-7;
const RNMX: f64 = 1.0 - EPS;

/// 与 `ran1()` 兼容的线性同余发生器
#[derive(Debug, Clone)]
pub struct CLcg {
    idum: i64,
    iy: i64,
    iv: [i64; NTAB],
}

impl CLcg {
    /// 由种子构造；种子取绝对值，0 视为 1
    pub fn new(seed: i64) -> Self {
        let mut idum = seed.checked_abs().unwrap_or(IM - 1).max(1);
        let mut iv = [0i64; NTAB];
        for j in (0..NTAB + 8).rev() {
            idum = Self::advance(idum);
            if j < NTAB {
                iv[j] = idum;
            }
        }
        Self { idum, iy: iv[0], iv }
    }

    /// Schrage 方法推进一步，避免溢出
    fn advance(idum: i64) -> i64 {
        let k = idum / IQ;
        let next = IA * (idum - k * IQ) - IR * k;
        if next < 0 {
            next + IM
        } else {
            next
        }
    }

    /// 下一个 (0, 1) 区间均匀随机数
    pub fn next_f64(&mut self) -> f64 {
        self.idum = Self::advance(self.idum);
        let j = (self.iy / NDIV) as usize;
        self.iy = self.iv[j];
        self.iv[j] = self.idum;
        (AM * self.iy as f64).min(RNMX)
    }
}

/// 在给定最大转角（弧度）的球冠内生成随机旋转矩阵
///
/// 每次调用消耗 3 个随机数。
pub fn mosaic_rotation_umat(mosaicity: f64, rng: &mut CLcg) -> Mat3 {
    let r1 = 2.0 * rng.next_f64() - 1.0;
    let r2 = 2.0 * rng.next_f64() - 1.0;
    let r3 = 2.0 * rng.next_f64() - 1.0;

    let xyrad = (1.0 - r2 * r2).sqrt();
    let rot = mosaicity * (1.0 - r3 * r3).powf(1.0 / 3.0);

    let v1 = xyrad * (PI * r1).sin();
    let v2 = xyrad * (PI * r1).cos();
    let v3 = r2;

    let t1 = rot.cos();
    let t2 = 1.0 - t1;
    let t8 = rot.sin();

    [
        [
            t1 + t2 * v1 * v1,
            t2 * v1 * v2 - t8 * v3,
            t2 * v1 * v3 + t8 * v2,
        ],
        [
            t2 * v1 * v2 + t8 * v3,
            t1 + t2 * v2 * v2,
            t2 * v2 * v3 - t8 * v1,
        ],
        [
            t2 * v1 * v3 - t8 * v2,
            t2 * v2 * v3 + t8 * v1,
            t1 + t2 * v3 * v3,
        ],
    ]
}

/// 将旋转矩阵分解为 XYZ 欧拉角（弧度），满足 R = Rz·Ry·Rx
pub fn umat_to_misset(umat: &Mat3) -> [f64; 3] {
    let (ux, _) = unitize(&umat[0]);
    let (uy, _) = unitize(&umat[1]);
    let (uz, _) = unitize(&umat[2]);

    if uz[0] * uz[0] < 1.0 {
        let rotx = uz[1].atan2(uz[2]);
        let roty = (-uz[0]).atan2((uz[1] * uz[1] + uz[2] * uz[2]).sqrt());
        let rotz = uy[0].atan2(ux[0]);
        [rotx, roty, rotz]
    } else {
        // 万向锁
        [PI, PI / 2.0, ux[1].atan2(-uy[1])]
    }
}
