//! IMDCT (Inverse Modified Discrete Cosine Transform)
//!
//! 长块: 每子带 18 点输入 -> 36 点输出, 由两个 9 点 DCT-III 组合而成.
//! 短块: 每子带 3 个 12 点 IMDCT, 窗口与重叠相加直接在变换内完成.
//! 每个子带保留 9 个系数的重叠缓冲, 跨 granule 持续存在.

#![allow(clippy::excessive_precision)]

use crate::header::{SHORT_BLOCK_TYPE, STOP_BLOCK_TYPE};
use crate::tables::{MDCT_WINDOW, TWID3, TWID9};

/// 每声道重叠缓冲大小 (32 子带 x 9)
pub const OVERLAP_LEN: usize = 288;

/// 9 点 DCT-III, 原地计算
fn dct3_9(y: &mut [f32; 9]) {
    let mut s0 = y[0];
    let mut s2 = y[2];
    let mut s4 = y[4];
    let mut s6 = y[6];
    let mut s8 = y[8];
    let mut t0 = s0 + s6 * 0.5;
    s0 -= s6;
    let mut t4 = (s4 + s2) * 0.93969262;
    let mut t2 = (s8 + s2) * 0.76604444;
    s6 = (s4 - s8) * 0.17364818;
    s4 += s8 - s2;

    s2 = s0 - s4 * 0.5;
    y[4] = s4 + s0;
    s8 = t0 - t2 + s6;
    s0 = t0 - t4 + t2;
    s4 = t0 + t4 - s6;

    let mut s1 = y[1];
    let mut s3 = y[3];
    let mut s5 = y[5];
    let mut s7 = y[7];

    s3 *= 0.86602540;
    t0 = (s5 + s1) * 0.98480775;
    t4 = (s5 - s7) * 0.34202014;
    t2 = (s1 + s7) * 0.64278761;
    s1 = (s1 - s5 - s7) * 0.86602540;

    s5 = t0 - s3 - t2;
    s7 = t4 - s3 - t0;
    s3 = t4 + s3 - t2;

    y[0] = s4 - s7;
    y[1] = s2 + s1;
    y[2] = s0 - s3;
    y[3] = s8 + s5;
    y[5] = s8 - s5;
    y[6] = s0 + s3;
    y[7] = s2 - s1;
    y[8] = s4 + s7;
}

/// 长块 IMDCT + 加窗 + 重叠相加
fn imdct36(grbuf: &mut [f32], overlap: &mut [f32], window: &[f32; 18], nbands: usize) {
    for (x, ovl_band) in grbuf
        .chunks_exact_mut(18)
        .zip(overlap.chunks_exact_mut(9))
        .take(nbands)
    {
        let mut co = [0f32; 9];
        let mut si = [0f32; 9];
        co[0] = -x[0];
        si[0] = x[17];
        for i in 0..4 {
            si[8 - 2 * i] = x[4 * i + 1] - x[4 * i + 2];
            co[1 + 2 * i] = x[4 * i + 1] + x[4 * i + 2];
            si[7 - 2 * i] = x[4 * i + 4] - x[4 * i + 3];
            co[2 + 2 * i] = -(x[4 * i + 3] + x[4 * i + 4]);
        }
        dct3_9(&mut co);
        dct3_9(&mut si);

        si[1] = -si[1];
        si[3] = -si[3];
        si[5] = -si[5];
        si[7] = -si[7];

        for i in 0..9 {
            let ovl = ovl_band[i];
            let sum = co[i] * TWID9[9 + i] + si[i] * TWID9[i];
            ovl_band[i] = co[i] * TWID9[i] - si[i] * TWID9[9 + i];
            x[i] = ovl * window[i] - sum * window[9 + i];
            x[17 - i] = ovl * window[9 + i] + sum * window[i];
        }
    }
}

fn idct3(x0: f32, x1: f32, x2: f32) -> [f32; 3] {
    let m1 = x1 * 0.86602540;
    let a1 = x0 - x2 * 0.5;
    [a1 + m1, x0 + x2, a1 - m1]
}

/// 12 点 IMDCT, 输入按 3 的步长交错 (`x[0], x[3], ..., x[15]`)
fn imdct12(x: &[f32], dst: &mut [f32], overlap: &mut [f32]) {
    let co = idct3(-x[0], x[6] + x[3], x[12] + x[9]);
    let mut si = idct3(x[15], x[12] - x[9], x[6] - x[3]);
    si[1] = -si[1];

    for i in 0..3 {
        let ovl = overlap[i];
        let sum = co[i] * TWID3[3 + i] + si[i] * TWID3[i];
        overlap[i] = co[i] * TWID3[i] - si[i] * TWID3[3 + i];
        dst[i] = ovl * TWID3[2 - i] - sum * TWID3[5 - i];
        dst[5 - i] = ovl * TWID3[5 - i] + sum * TWID3[2 - i];
    }
}

fn imdct_short(grbuf: &mut [f32], overlap: &mut [f32], nbands: usize) {
    for (x, ovl_band) in grbuf
        .chunks_exact_mut(18)
        .zip(overlap.chunks_exact_mut(9))
        .take(nbands)
    {
        let mut tmp = [0f32; 18];
        tmp.copy_from_slice(x);
        x[..6].copy_from_slice(&ovl_band[..6]);
        let (head, tail) = ovl_band.split_at_mut(6);
        imdct12(&tmp, &mut x[6..12], tail);
        imdct12(&tmp[1..], &mut x[12..18], tail);
        imdct12(&tmp[2..], head, tail);
    }
}

/// 对一个声道的整个 granule 做 IMDCT
///
/// 前 `n_long_bands` 个子带 (混合块) 总是使用普通长窗.
pub fn imdct_granule(grbuf: &mut [f32], overlap: &mut [f32], block_type: u8, n_long_bands: usize) {
    if n_long_bands > 0 {
        imdct36(grbuf, overlap, &MDCT_WINDOW[0], n_long_bands);
    }
    let grbuf = &mut grbuf[18 * n_long_bands..];
    let overlap = &mut overlap[9 * n_long_bands..];
    let rest = 32 - n_long_bands;
    if block_type == SHORT_BLOCK_TYPE {
        imdct_short(grbuf, overlap, rest);
    } else {
        let window = &MDCT_WINDOW[usize::from(block_type == STOP_BLOCK_TYPE)];
        imdct36(grbuf, overlap, window, rest);
    }
}

/// 频率反转: 奇数子带的奇数样本取反
pub fn change_sign(grbuf: &mut [f32]) {
    for band in grbuf.chunks_exact_mut(18).skip(1).step_by(2) {
        for v in band.iter_mut().skip(1).step_by(2) {
            *v = -*v;
        }
    }
}
