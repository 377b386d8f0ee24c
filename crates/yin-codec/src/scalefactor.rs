//! Layer III 比例因子解码与增益计算.
//!
//! 比例因子以 1/4 dB 步进的整数形式读出, 再与 global_gain,
//! subblock_gain, preflag 合并为每个频带的线性增益.

use yin_core::BitReader;

use crate::header::FrameHeader;
use crate::side_info::GranuleInfo;
use crate::tables::{EXPFRAC, PREAMP, SCF_MOD, SCF_PARTITIONS, SCFC_DECODE};

/// 增益可表示的最大指数 (按 1/4 步进)
const MAX_SCFI: i32 = 44;

/// 每个声道的强度立体声位置表长度
pub const IST_POS_LEN: usize = 39;

/// 计算 `y * 2^(-exp_q2 / 4)`
///
/// 指数按 30 为上限分段累乘, 与参考实现保持相同的舍入路径.
pub fn ldexp_q2(mut y: f32, mut exp_q2: i32) -> f32 {
    loop {
        let e = exp_q2.min(30 * 4);
        y *= EXPFRAC[(e & 3) as usize] * ((1i32 << 30) >> (e >> 2)) as f32;
        exp_q2 -= e;
        if exp_q2 <= 0 {
            break;
        }
    }
    y
}

/// 按分组读取原始比例因子
///
/// `scfsi` 的第 3 位为 1 时复用上一个 granule 的值 (保存在 `ist_pos` 中).
/// `scfsi < 0` 表示 MPEG-2, 此时全 1 的值标记强度立体声位置无效 (255).
fn read_scalefactors(
    scf: &mut [u8; 40],
    ist_pos: &mut [u8; IST_POS_LEN],
    scf_size: &[u8; 4],
    scf_count: &[u8],
    bs: &mut BitReader<'_>,
    mut scfsi: i32,
) {
    let mut off = 0usize;
    for (&count, &bits) in scf_count.iter().take(4).zip(scf_size) {
        let cnt = usize::from(count);
        if cnt == 0 {
            break;
        }
        let range = off..off + cnt;
        if scfsi & 8 != 0 {
            scf[range.clone()].copy_from_slice(&ist_pos[range]);
        } else if bits == 0 {
            scf[range.clone()].fill(0);
            ist_pos[range].fill(0);
        } else {
            let max_scf: i32 = if scfsi < 0 { (1 << bits) - 1 } else { -1 };
            for k in range {
                let s = bs.get_bits(u32::from(bits)) as i32;
                ist_pos[k] = if s == max_scf { 255 } else { s as u8 };
                scf[k] = s as u8;
            }
        }
        off += cnt;
        scfsi *= 2;
    }
    scf[off..off + 3].fill(0);
}

/// 解码一个 (granule, 声道) 的比例因子, 输出每个频带的线性增益
///
/// `ist_pos` 在 MPEG-1 下保存供下一 granule 复用的比例因子,
/// 在 MPEG-2 强度立体声下保存右声道的强度位置.
pub fn decode_scalefactors(
    hdr: &FrameHeader,
    ist_pos: &mut [u8; IST_POS_LEN],
    bs: &mut BitReader<'_>,
    gr: &GranuleInfo,
    scf: &mut [f32; 40],
    ch: usize,
) {
    let row = usize::from(gr.n_short_sfb != 0) + usize::from(gr.n_long_sfb == 0);
    let partition = &SCF_PARTITIONS[row];
    let scf_shift = u32::from(gr.scalefac_scale) + 1;
    let mut scf_size = [0u8; 4];
    let mut iscf = [0u8; 40];

    let (scf_count, scfsi) = if hdr.is_mpeg1() {
        let part = SCFC_DECODE[gr.scalefac_compress as usize & 15];
        scf_size[0] = part >> 2;
        scf_size[1] = part >> 2;
        scf_size[2] = part & 3;
        scf_size[3] = part & 3;
        (&partition[..4], i32::from(gr.scfsi))
    } else {
        let ist = usize::from(hdr.test_intensity_stereo() && ch != 0);
        let mut sfc = (gr.scalefac_compress >> ist) as i32;
        let mut k = ist * 3 * 4;
        while sfc >= 0 {
            let mut modprod = 1i32;
            for i in (0..4).rev() {
                let m = i32::from(SCF_MOD[k + i]);
                scf_size[i] = (sfc / modprod % m) as u8;
                modprod *= m;
            }
            sfc -= modprod;
            k += 4;
        }
        (&partition[k..], -16)
    };
    read_scalefactors(&mut iscf, ist_pos, &scf_size, scf_count, bs, scfsi);

    if gr.n_short_sfb != 0 {
        let sh = 3 - scf_shift;
        for i in (0..gr.n_short_sfb).step_by(3) {
            for w in 0..3 {
                let idx = gr.n_long_sfb + i + w;
                iscf[idx] = iscf[idx].wrapping_add(gr.subblock_gain[w] << sh);
            }
        }
    } else if gr.preflag {
        for (v, &amp) in iscf[11..21].iter_mut().zip(&PREAMP) {
            *v = v.wrapping_add(amp);
        }
    }

    let ms = if hdr.is_ms_stereo() { 2 } else { 0 };
    let gain_exp = i32::from(gr.global_gain) - 4 - 210 - ms;
    let gain = ldexp_q2((1 << (MAX_SCFI / 4)) as f32, MAX_SCFI - gain_exp);
    let n = gr.n_long_sfb + gr.n_short_sfb;
    for (dst, &s) in scf[..n].iter_mut().zip(&iscf) {
        *dst = ldexp_q2(gain, i32::from(s) << scf_shift);
    }
}
