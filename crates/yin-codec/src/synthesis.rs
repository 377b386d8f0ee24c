//! 多相合成滤波器组 (Polyphase Synthesis Filterbank)
//!
//! 32 个子带的样本先做 32 点 DCT-II, 结果写入 `lins` 环形历史缓冲,
//! 再与 15 x 16 的合成窗口做乘加, 每两个时间槽输出 64 个 PCM 样本.
//!
//! 声道交错输出, 单声道时右声道位置与左声道相同.

#![allow(clippy::excessive_precision)]

use crate::tables::{DCT_SEC, SYNTH_WIN};

/// 跨 granule 保留的合成历史长度 (15 x 64)
pub const QMF_STATE_LEN: usize = 15 * 64;
/// 合成工作区长度 (18 + 15 个时间槽 x 64)
pub const SYNTH_SCRATCH_LEN: usize = 33 * 64;

const ZLIN: usize = 15 * 64;

/// 对 `n` 个时间槽做 32 点 DCT-II (子带按 18 的步长存放)
pub fn dct_ii(grbuf: &mut [f32], n: usize) {
    for k in 0..n {
        let mut t = [[0f32; 8]; 4];
        let y = |i: usize| k + i * 18;

        for i in 0..8 {
            let x0 = grbuf[y(i)];
            let x1 = grbuf[y(15 - i)];
            let x2 = grbuf[y(16 + i)];
            let x3 = grbuf[y(31 - i)];
            let t0 = x0 + x3;
            let t1 = x1 + x2;
            let t2 = (x1 - x2) * DCT_SEC[3 * i];
            let t3 = (x0 - x3) * DCT_SEC[3 * i + 1];
            t[0][i] = t0 + t1;
            t[1][i] = (t0 - t1) * DCT_SEC[3 * i + 2];
            t[2][i] = t3 + t2;
            t[3][i] = (t3 - t2) * DCT_SEC[3 * i + 2];
        }

        for x in t.iter_mut() {
            let [mut x0, mut x1, mut x2, mut x3, mut x4, mut x5, mut x6, mut x7] = *x;
            let mut xt = x0 - x7;
            x0 += x7;
            x7 = x1 - x6;
            x1 += x6;
            x6 = x2 - x5;
            x2 += x5;
            x5 = x3 - x4;
            x3 += x4;
            x4 = x0 - x3;
            x0 += x3;
            x3 = x1 - x2;
            x1 += x2;
            x[0] = x0 + x1;
            x[4] = (x0 - x1) * 0.70710677;
            x5 += x6;
            x6 = (x6 + x7) * 0.70710677;
            x7 += xt;
            x3 = (x3 + x4) * 0.70710677;
            // 旋转 PI/8
            x5 -= x7 * 0.198912367;
            x7 += x5 * 0.382683432;
            x5 -= x7 * 0.198912367;
            x0 = xt - x6;
            xt += x6;
            x[1] = (xt + x7) * 0.50979561;
            x[2] = (x4 + x3) * 0.54119611;
            x[3] = (x0 - x5) * 0.60134488;
            x[5] = (x0 + x5) * 0.89997619;
            x[6] = (x4 - x3) * 1.30656302;
            x[7] = (xt - x7) * 2.56291556;
        }

        for i in 0..7 {
            let base = k + i * 4 * 18;
            grbuf[base] = t[0][i];
            grbuf[base + 18] = t[2][i] + t[3][i] + t[3][i + 1];
            grbuf[base + 2 * 18] = t[1][i] + t[1][i + 1];
            grbuf[base + 3 * 18] = t[2][i + 1] + t[3][i] + t[3][i + 1];
        }
        let base = k + 7 * 4 * 18;
        grbuf[base] = t[0][7];
        grbuf[base + 18] = t[2][7] + t[3][7];
        grbuf[base + 2 * 18] = t[1][7];
        grbuf[base + 3 * 18] = t[3][7];
    }
}

/// 浮点样本转 16 位整数, 四舍五入并远离零
pub fn scale_pcm(sample: f32) -> i16 {
    if sample >= 32766.5 {
        return i16::MAX;
    }
    if sample <= -32767.5 {
        return i16::MIN;
    }
    let mut s = (sample + 0.5) as i16;
    if s < 0 {
        s -= 1;
    }
    s
}

/// 输出第 0 和第 16 个样本 (窗口对称点, 单独计算)
fn synth_pair(pcm: &mut [i16], at: usize, nch: usize, z: &[f32]) {
    let mut a = (z[14 * 64] - z[0]) * 29.0;
    a += (z[64] + z[13 * 64]) * 213.0;
    a += (z[12 * 64] - z[2 * 64]) * 459.0;
    a += (z[3 * 64] + z[11 * 64]) * 2037.0;
    a += (z[10 * 64] - z[4 * 64]) * 5153.0;
    a += (z[5 * 64] + z[9 * 64]) * 6574.0;
    a += (z[8 * 64] - z[6 * 64]) * 37489.0;
    a += z[7 * 64] * 75038.0;
    pcm[at] = scale_pcm(a);

    let z = &z[2..];
    let mut a = z[14 * 64] * 104.0;
    a += z[12 * 64] * 1567.0;
    a += z[10 * 64] * 9727.0;
    a += z[8 * 64] * 64019.0;
    a += z[6 * 64] * -9975.0;
    a += z[4 * 64] * -45.0;
    a += z[2 * 64] * 146.0;
    a += z[0] * -5.0;
    pcm[at + 16 * nch] = scale_pcm(a);
}

/// 合成两个时间槽 (第 `col` 与 `col + 1` 个), 输出 64 x nch 个样本到 `pcm[at..]`
///
/// `lins` 从本次对应的历史位置开始, 至少 16 x 64 个元素.
fn synth(grbuf: &[f32], col: usize, pcm: &mut [i16], at: usize, nch: usize, lins: &mut [f32]) {
    let right = 576 * (nch - 1);
    let xl = |n: usize| grbuf[col + n];
    let xr = |n: usize| grbuf[col + right + n];
    let dstl = at;
    let dstr = at + nch - 1;

    lins[ZLIN + 60] = xl(18 * 16);
    lins[ZLIN + 61] = xr(18 * 16);
    lins[ZLIN + 62] = xl(0);
    lins[ZLIN + 63] = xr(0);

    lins[ZLIN + 124] = xl(1 + 18 * 16);
    lins[ZLIN + 125] = xr(1 + 18 * 16);
    lins[ZLIN + 126] = xl(1);
    lins[ZLIN + 127] = xr(1);

    synth_pair(pcm, dstr, nch, &lins[61..]);
    synth_pair(pcm, dstr + 32 * nch, nch, &lins[61 + 64..]);
    synth_pair(pcm, dstl, nch, &lins[60..]);
    synth_pair(pcm, dstl + 32 * nch, nch, &lins[60 + 64..]);

    for (n, i) in (0..15).rev().enumerate() {
        let z = ZLIN + 4 * i;
        lins[z] = xl(18 * (31 - i));
        lins[z + 1] = xr(18 * (31 - i));
        lins[z + 2] = xl(1 + 18 * (31 - i));
        lins[z + 3] = xr(1 + 18 * (31 - i));
        lins[z + 64] = xl(1 + 18 * (1 + i));
        lins[z + 64 + 1] = xr(1 + 18 * (1 + i));
        lins[z - 64 + 2] = xl(18 * (1 + i));
        lins[z - 64 + 3] = xr(18 * (1 + i));

        let win = &SYNTH_WIN[n * 16..n * 16 + 16];
        let mut a = [0f32; 4];
        let mut b = [0f32; 4];
        for k in 0..8 {
            let w0 = win[2 * k];
            let w1 = win[2 * k + 1];
            let vz = z - k * 64;
            let vy = z - (15 - k) * 64;
            for j in 0..4 {
                let (zv, yv) = (lins[vz + j], lins[vy + j]);
                if k == 0 {
                    b[j] = zv * w1 + yv * w0;
                    a[j] = zv * w0 - yv * w1;
                } else if k % 2 == 1 {
                    b[j] += zv * w1 + yv * w0;
                    a[j] += yv * w1 - zv * w0;
                } else {
                    b[j] += zv * w1 + yv * w0;
                    a[j] += zv * w0 - yv * w1;
                }
            }
        }

        pcm[dstr + (15 - i) * nch] = scale_pcm(a[1]);
        pcm[dstr + (17 + i) * nch] = scale_pcm(b[1]);
        pcm[dstl + (15 - i) * nch] = scale_pcm(a[0]);
        pcm[dstl + (17 + i) * nch] = scale_pcm(b[0]);
        pcm[dstr + (47 - i) * nch] = scale_pcm(a[3]);
        pcm[dstr + (49 + i) * nch] = scale_pcm(b[3]);
        pcm[dstl + (47 - i) * nch] = scale_pcm(a[2]);
        pcm[dstl + (49 + i) * nch] = scale_pcm(b[2]);
    }
}

/// 合成一个 granule 的 `nbands` 个时间槽
///
/// `grbuf` 为 `[声道][32 子带 x 18]` 布局, 合成前原地做 DCT-II.
/// `pcm` 接收 `nbands * 32 * nch` 个交错样本. `lins` 为工作区
/// ([`SYNTH_SCRATCH_LEN`] 个元素), 结束时尾部历史写回 `qmf_state`.
pub fn synth_granule(
    qmf_state: &mut [f32; QMF_STATE_LEN],
    grbuf: &mut [f32],
    nbands: usize,
    nch: usize,
    pcm: &mut [i16],
    lins: &mut [f32],
) {
    for ch in 0..nch {
        dct_ii(&mut grbuf[576 * ch..], nbands);
    }

    lins[..QMF_STATE_LEN].copy_from_slice(qmf_state);
    for i in (0..nbands).step_by(2) {
        synth(grbuf, i, pcm, 32 * nch * i, nch, &mut lins[i * 64..]);
    }

    let tail = &lins[nbands * 64..nbands * 64 + QMF_STATE_LEN];
    if nch == 1 {
        // 单声道只保存偶数位置的历史
        for (dst, src) in qmf_state.iter_mut().zip(tail).step_by(2) {
            *dst = *src;
        }
    } else {
        qmf_state.copy_from_slice(tail);
    }
}
