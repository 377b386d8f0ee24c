//! Layer III 联合立体声处理.
//!
//! - MS 立体声: L = M + S, R = M - S
//! - 强度立体声: 在右声道最高非零频带之上, 由左声道按声像系数重建两个声道
//!
//! 调用方以 `left` / `right` 两个 576 点切片传入同一 granule 的两个声道.

use crate::header::FrameHeader;
use crate::scalefactor::{IST_POS_LEN, ldexp_q2};
use crate::side_info::GranuleInfo;
use crate::tables::PAN;

/// MS 立体声重建前 `n` 个系数
pub fn midside(left: &mut [f32], right: &mut [f32], n: usize) {
    for (l, r) in left[..n].iter_mut().zip(&mut right[..n]) {
        let a = *l;
        let b = *r;
        *l = a + b;
        *r = a - b;
    }
}

fn intensity_band(left: &mut [f32], right: &mut [f32], kl: f32, kr: f32) {
    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        *r = *l * kr;
        *l *= kl;
    }
}

/// 找出右声道每个窗口组 (i % 3) 中最后一个含非零系数的频带, 没有时为 -1
fn stereo_top_band(right: &[f32], sfb: &[u8], nbands: usize) -> [i32; 3] {
    let mut max_band = [-1i32; 3];
    let mut off = 0usize;
    for (i, &width) in sfb.iter().take(nbands).enumerate() {
        let width = usize::from(width);
        if right[off..off + width].chunks_exact(2).any(|p| p[0] != 0.0 || p[1] != 0.0) {
            max_band[i % 3] = i as i32;
        }
        off += width;
    }
    max_band
}

fn stereo_process(
    left: &mut [f32],
    right: &mut [f32],
    ist_pos: &[u8; IST_POS_LEN],
    sfb: &[u8],
    hdr: &FrameHeader,
    max_band: &[i32; 3],
    mpeg2_sh: u32,
) {
    let mpeg1 = hdr.is_mpeg1();
    let max_pos = if mpeg1 { 7 } else { 64 };
    let ms = hdr.test_ms_stereo();
    let mut off = 0usize;

    for (i, &width) in sfb.iter().take_while(|&&w| w != 0).enumerate() {
        let width = usize::from(width);
        let range = off..off + width;
        let ipos = u32::from(ist_pos[i]);
        if i as i32 > max_band[i % 3] && ipos < max_pos {
            let s = if ms { std::f32::consts::SQRT_2 } else { 1.0 };
            let (kl, kr) = if mpeg1 {
                (PAN[2 * ipos as usize], PAN[2 * ipos as usize + 1])
            } else {
                let k = ldexp_q2(1.0, (((ipos + 1) >> 1) << mpeg2_sh) as i32);
                if ipos & 1 != 0 { (k, 1.0) } else { (1.0, k) }
            };
            intensity_band(&mut left[range.clone()], &mut right[range], kl * s, kr * s);
        } else if ms {
            midside(&mut left[range.clone()], &mut right[range], width);
        }
        off += width;
    }
}

/// 强度立体声处理 (同时处理未使用强度编码频带的 MS 立体声)
///
/// `gr` 为当前 granule 的 `[左声道, 右声道]` 边信息, `ist_pos` 为右声道的强度位置.
/// `gr` 不足两个声道时不做处理.
pub fn intensity_stereo(
    left: &mut [f32],
    right: &mut [f32],
    ist_pos: &mut [u8; IST_POS_LEN],
    gr: &[GranuleInfo],
    hdr: &FrameHeader,
) {
    let [g, right_gr, ..] = gr else {
        return;
    };
    let n_sfb = g.n_long_sfb + g.n_short_sfb;
    let max_blocks = if g.n_short_sfb != 0 { 3 } else { 1 };

    let mut max_band = stereo_top_band(right, g.sfb_table, n_sfb);
    if g.n_long_sfb != 0 {
        let top = max_band[0].max(max_band[1]).max(max_band[2]);
        max_band = [top; 3];
    }
    let default_pos = if hdr.is_mpeg1() { 3 } else { 0 };
    for (i, &band) in max_band.iter().enumerate().take(max_blocks) {
        let itop = n_sfb - max_blocks + i;
        let prev = itop - max_blocks;
        ist_pos[itop] = if band >= prev as i32 { default_pos } else { ist_pos[prev] };
    }
    stereo_process(
        left,
        right,
        ist_pos,
        g.sfb_table,
        hdr,
        &max_band,
        right_gr.scalefac_compress & 1,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tables::SCF_LONG;

    /// MPEG-1 联合立体声, 仅强度立体声
    const IS_HDR: FrameHeader = FrameHeader::new([0xFF, 0xFB, 0x90, 0x50]);
    /// MPEG-1 联合立体声, MS + 强度
    const MS_IS_HDR: FrameHeader = FrameHeader::new([0xFF, 0xFB, 0x90, 0x70]);

    #[test]
    fn test_midside() {
        let mut l = [1.0, 2.0, 3.0];
        let mut r = [0.5, -1.0, 0.0];
        midside(&mut l, &mut r, 2);
        assert_eq!(l, [1.5, 1.0, 3.0]);
        assert_eq!(r, [0.5, 3.0, 0.0]);
    }

    #[test]
    fn test_top_band_per_window() {
        let sfb = [4u8, 4, 4, 4, 4, 4, 0];
        let mut right = [0f32; 24];
        right[5] = 1.0; // 频带 1
        right[13] = -1.0; // 频带 3
        assert_eq!(stereo_top_band(&right, &sfb, 6), [3, 1, -1]);
    }

    #[test]
    fn test_intensity_long_blocks() {
        let gr = [GranuleInfo::default(); 2];
        let mut left = [1.0f32; 576];
        let mut right = [0f32; 576];
        // 右声道前两个频带有数据
        right[..8].fill(0.25);
        let mut ist_pos = [3u8; IST_POS_LEN];
        ist_pos[2] = 6; // 全部给左声道
        ist_pos[3] = 0; // 全部给右声道
        ist_pos[4] = 7; // 无效位置: 保持不变
        intensity_stereo(&mut left, &mut right, &mut ist_pos, &gr, &IS_HDR);

        let sfb = &SCF_LONG[0];
        let start = |b: usize| sfb[..b].iter().map(|&w| usize::from(w)).sum::<usize>();
        // 频带 0..2 不处理
        assert_eq!(left[0], 1.0);
        assert_eq!(right[0], 0.25);
        // 频带 2: kl = 1, kr = 0
        assert_eq!(left[start(2)], 1.0);
        assert_eq!(right[start(2)], 0.0);
        // 频带 3: kl = 0, kr = 1
        assert_eq!(left[start(3)], 0.0);
        assert_eq!(right[start(3)], 1.0);
        // 频带 4 位置无效, 非 MS 模式不处理
        assert_eq!(left[start(4)], 1.0);
        assert_eq!(right[start(4)], 0.0);
        // 最后一个频带沿用前一频带的位置 3 (居中)
        assert_eq!(ist_pos[21], 3);
        assert!((left[575] - 0.5).abs() < 1e-6);
        assert!((right[575] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_ms_applies_below_intensity_bound() {
        let gr = [GranuleInfo::default(); 2];
        let mut left = [1.0f32; 576];
        let mut right = [0f32; 576];
        right[0] = 0.5;
        let mut ist_pos = [7u8; IST_POS_LEN];
        intensity_stereo(&mut left, &mut right, &mut ist_pos, &gr, &MS_IS_HDR);
        // 频带 0 在强度边界以下: MS 重建
        assert_eq!(left[0], 1.5);
        assert_eq!(right[0], 0.5);
        assert_eq!(left[1], 1.0);
        assert_eq!(right[1], 1.0);
    }

    #[test]
    fn test_mpeg2_intensity_scale() {
        let hdr = FrameHeader::new([0xFF, 0xF3, 0x80, 0x50]);
        let gr = [GranuleInfo::default(); 2];
        let mut left = [1.0f32; 576];
        let mut right = [0f32; 576];
        let mut ist_pos = [0u8; IST_POS_LEN];
        ist_pos[0] = 1; // 奇数: kl = 2^(-1/4), kr = 1
        ist_pos[1] = 2; // 偶数: kl = 1, kr = 2^(-1/4)
        intensity_stereo(&mut left, &mut right, &mut ist_pos, &gr, &hdr);
        let k = ldexp_q2(1.0, 1);
        assert_eq!(left[0], k);
        assert_eq!(right[0], 1.0);
        let b1 = usize::from(SCF_LONG[0][0]);
        assert_eq!(left[b1], 1.0);
        assert_eq!(right[b1], k);
    }
}
