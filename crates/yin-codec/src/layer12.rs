//! Layer I / Layer II 解码.
//!
//! 两层共用同一套结构: 位分配 -> 比例因子选择信息 -> 比例因子 -> 子带样本.
//! Layer I 每帧 12 个样本一组; Layer II 每帧 3 个 part, 每个 part 12 个样本,
//! 并支持 3/5/9 级量化的分组编码.

use yin_core::BitReader;

use crate::header::{ChannelMode, FrameHeader};
use crate::tables::BITALLOC_CODE_TAB;

/// 位分配表中连续若干子带共用的码表描述
#[derive(Debug, Clone, Copy)]
pub struct SubbandAlloc {
    /// 在 `BITALLOC_CODE_TAB` 中的起始位置
    pub tab_offset: u8,
    /// 位分配字段宽度
    pub code_tab_width: u8,
    /// 使用该码表的子带数
    pub band_count: u8,
}

const fn alloc(tab_offset: u8, code_tab_width: u8, band_count: u8) -> SubbandAlloc {
    SubbandAlloc {
        tab_offset,
        code_tab_width,
        band_count,
    }
}

const ALLOC_L1: [SubbandAlloc; 1] = [alloc(76, 4, 32)];
const ALLOC_L2_MPEG2: [SubbandAlloc; 3] = [alloc(60, 4, 4), alloc(44, 3, 7), alloc(44, 2, 19)];
const ALLOC_L2_MPEG1: [SubbandAlloc; 4] =
    [alloc(0, 4, 3), alloc(16, 4, 8), alloc(32, 3, 12), alloc(40, 2, 7)];
const ALLOC_L2_MPEG1_LOWRATE: [SubbandAlloc; 2] = [alloc(44, 4, 2), alloc(44, 3, 10)];

macro_rules! deq_l12 {
    ($($x:expr),* $(,)?) => {
        [$(9.53674316e-07 / $x, 7.56931807e-07 / $x, 6.00777173e-07 / $x),*]
    };
}

/// 比例因子反量化表: 按位分配 (ba - 2) 分组, 每组对应 6 位比例因子的 3 个小数步进
#[allow(clippy::excessive_precision)]
const DEQ_L12: [f32; 54] = deq_l12![
    3.0, 7.0, 15.0, 31.0, 63.0, 127.0, 255.0, 511.0, 1023.0, 2047.0, 4095.0, 8191.0, 16383.0,
    32767.0, 65535.0, 3.0, 5.0, 9.0,
];

/// 一帧的位分配与比例因子
///
/// `bitalloc` / `scfcod` 按 `[子带 0 左, 子带 0 右, 子带 1 左, ...]` 交错存放,
/// `scf` 每个子带 6 个 (左 3 个 part, 右 3 个 part).
#[derive(Debug, Clone)]
pub struct ScaleInfo {
    pub scf: [f32; 3 * 64],
    pub total_bands: usize,
    pub stereo_bands: usize,
    pub bitalloc: [u8; 64],
    pub scfcod: [u8; 64],
}

impl Default for ScaleInfo {
    fn default() -> Self {
        Self {
            scf: [0.0; 3 * 64],
            total_bands: 0,
            stereo_bands: 0,
            bitalloc: [0; 64],
            scfcod: [0; 64],
        }
    }
}

/// 根据帧头选择位分配表, 同时确定子带总数与独立立体声子带数
fn subband_alloc_table(hdr: &FrameHeader, sci: &mut ScaleInfo) -> &'static [SubbandAlloc] {
    let mode = hdr.channel_mode();
    let stereo_bands = match mode {
        ChannelMode::Mono => 0,
        ChannelMode::JointStereo => (usize::from(hdr.mode_extension()) << 2) + 4,
        _ => 32,
    };

    let (table, nbands): (&'static [SubbandAlloc], usize) = if hdr.is_layer1() {
        (&ALLOC_L1, 32)
    } else if !hdr.is_mpeg1() {
        (&ALLOC_L2_MPEG2, 30)
    } else {
        let sample_rate_idx = hdr.sample_rate_index();
        let mut kbps = hdr.bitrate_kbps() >> u32::from(mode != ChannelMode::Mono);
        if kbps == 0 {
            // 自由格式按高码率处理
            kbps = 192;
        }
        if kbps < 56 {
            let nbands = if sample_rate_idx == 2 { 12 } else { 8 };
            (&ALLOC_L2_MPEG1_LOWRATE, nbands)
        } else if kbps >= 96 && sample_rate_idx != 1 {
            (&ALLOC_L2_MPEG1, 30)
        } else {
            (&ALLOC_L2_MPEG1, 27)
        }
    };

    sci.total_bands = nbands;
    sci.stereo_bands = stereo_bands.min(nbands);
    table
}

fn read_scalefactors(bs: &mut BitReader<'_>, sci: &mut ScaleInfo) {
    let bands = sci.total_bands * 2;
    for i in 0..bands {
        let ba = usize::from(sci.bitalloc[i]);
        let mask = if ba != 0 {
            4 + ((19 >> sci.scfcod[i]) & 3)
        } else {
            0
        };
        let mut s = 0.0f32;
        for (k, m) in [4, 2, 1].into_iter().enumerate() {
            if mask & m != 0 {
                let b = bs.get_bits(6) as usize;
                s = DEQ_L12[ba * 3 - 6 + b % 3] * ((1i32 << 21) >> (b / 3)) as f32;
            }
            sci.scf[i * 3 + k] = s;
        }
    }
}

/// 读取位分配, 比例因子选择信息与比例因子
pub fn read_scale_info(hdr: &FrameHeader, bs: &mut BitReader<'_>, sci: &mut ScaleInfo) {
    let mut allocs = subband_alloc_table(hdr, sci).iter();
    let mut next_switch = 0usize;
    let mut ba_bits = 0u32;
    let mut code_tab: &[u8] = &BITALLOC_CODE_TAB;

    for i in 0..sci.total_bands {
        if i == next_switch {
            if let Some(a) = allocs.next() {
                next_switch += usize::from(a.band_count);
                ba_bits = u32::from(a.code_tab_width);
                code_tab = &BITALLOC_CODE_TAB[usize::from(a.tab_offset)..];
            }
        }
        let mut ba = code_tab[bs.get_bits(ba_bits) as usize];
        sci.bitalloc[2 * i] = ba;
        if i < sci.stereo_bands {
            ba = code_tab[bs.get_bits(ba_bits) as usize];
        }
        sci.bitalloc[2 * i + 1] = if sci.stereo_bands != 0 { ba } else { 0 };
    }

    for i in 0..2 * sci.total_bands {
        sci.scfcod[i] = if sci.bitalloc[i] == 0 {
            6
        } else if hdr.is_layer1() {
            2
        } else {
            bs.get_bits(2) as u8
        };
    }

    read_scalefactors(bs, sci);

    // 联合立体声高频子带的右声道样本不单独传输
    for i in sci.stereo_bands..sci.total_bands {
        sci.bitalloc[2 * i + 1] = 0;
    }
}

/// 反量化 `group_size` x 4 个样本 (Layer I 为 1, Layer II 为 3)
///
/// `grbuf` 从当前样本偏移开始, 左声道在前 576 个位置, 右声道紧随其后.
/// 返回写入的样本数.
pub fn dequantize_granule(
    grbuf: &mut [f32],
    bs: &mut BitReader<'_>,
    sci: &ScaleInfo,
    group_size: usize,
) -> usize {
    let mut choff = 576isize;
    for j in 0..4 {
        let mut dst = (group_size * j) as isize;
        for &ba in &sci.bitalloc[..2 * sci.total_bands] {
            let ba = u32::from(ba);
            let out = &mut grbuf[dst as usize..dst as usize + group_size];
            if ba != 0 && ba < 17 {
                let half = (1i32 << (ba - 1)) - 1;
                for v in out.iter_mut() {
                    *v = (bs.get_bits(ba) as i32 - half) as f32;
                }
            } else if ba != 0 {
                // 分组量化: 3/5/9 级, 码字宽度 5/7/10 位
                let m = (2u32 << (ba - 17)) + 1;
                let mut code = bs.get_bits(m + 2 - (m >> 3));
                for v in out.iter_mut() {
                    *v = ((code % m) as i32 - (m / 2) as i32) as f32;
                    code /= m;
                }
            }
            dst += choff;
            choff = 18 - choff;
        }
    }
    group_size * 4
}

/// 对 12 个样本一组的子带样本乘以比例因子
///
/// `part` 为 part 序号 (Layer I 固定取 2, 各 part 比例因子相同).
/// 不独立编码的高频子带先从左声道复制到右声道.
pub fn apply_scf_384(sci: &ScaleInfo, part: usize, dst: &mut [f32]) {
    let from = sci.stereo_bands * 18;
    let to = sci.total_bands * 18;
    dst.copy_within(from..to, 576 + from);
    for (i, band) in dst[..to].chunks_exact_mut(18).enumerate() {
        let scf_l = sci.scf[part + i * 6];
        for v in &mut band[..12] {
            *v *= scf_l;
        }
    }
    for i in 0..sci.total_bands {
        let scf_r = sci.scf[part + i * 6 + 3];
        for v in &mut dst[576 + i * 18..576 + i * 18 + 12] {
            *v *= scf_r;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use yin_core::BitWriter;

    fn bands(hdr: [u8; 4]) -> (usize, usize) {
        let mut sci = ScaleInfo::default();
        subband_alloc_table(&FrameHeader::new(hdr), &mut sci);
        (sci.total_bands, sci.stereo_bands)
    }

    #[test]
    fn test_alloc_table_selection() {
        // Layer I 立体声
        assert_eq!(bands([0xFF, 0xFF, 0x90, 0x00]), (32, 32));
        // Layer I 联合立体声, mode_extension = 1
        assert_eq!(bands([0xFF, 0xFF, 0x90, 0x50]), (32, 8));
        // Layer II MPEG-1 44.1k 立体声 128 kbps: 每声道 64 kbps
        assert_eq!(bands([0xFF, 0xFD, 0x80, 0x00]), (27, 27));
        // 192 kbps @ 44.1k: 每声道 96 kbps
        assert_eq!(bands([0xFF, 0xFD, 0xA0, 0x00]), (30, 30));
        // 192 kbps @ 48k 仍为 27
        assert_eq!(bands([0xFF, 0xFD, 0xA4, 0x00]), (27, 27));
        // 低码率单声道 32 kbps
        assert_eq!(bands([0xFF, 0xFD, 0x10, 0xC0]), (8, 0));
        // 低码率 32 kHz
        assert_eq!(bands([0xFF, 0xFD, 0x18, 0xC0]), (12, 0));
        // MPEG-2 Layer II
        assert_eq!(bands([0xFF, 0xF5, 0x80, 0x00]), (30, 30));
    }

    #[test]
    fn test_layer1_mono_band() {
        // Layer I 单声道: 子带 0 分配 4 位, 比例因子 b = 3, 12 个样本均为 15
        let hdr = FrameHeader::new([0xFF, 0xFF, 0x90, 0xC0]);
        let mut bw = BitWriter::new();
        bw.write_bits(3, 4);
        for _ in 1..32 {
            bw.write_bits(0, 4);
        }
        bw.write_bits(3, 6);
        for _ in 0..12 {
            bw.write_bits(15, 4);
        }
        let data = bw.finish();
        let mut bs = BitReader::new(&data);
        let mut sci = ScaleInfo::default();
        read_scale_info(&hdr, &mut bs, &mut sci);
        assert_eq!(sci.bitalloc[0], 4);
        assert_eq!(sci.scfcod[0], 2);
        assert_eq!(sci.scfcod[1], 6);
        let scale = DEQ_L12[6] * (1 << 20) as f32;
        assert_eq!(sci.scf[..3], [scale; 3]);

        let mut grbuf = vec![0f32; 1152];
        let mut offset = 0;
        for _ in 0..3 {
            offset += dequantize_granule(&mut grbuf[offset..], &mut bs, &sci, 1);
        }
        assert_eq!(offset, 12);
        assert!(!bs.is_overrun());
        assert!(grbuf[..12].iter().all(|&v| v == 8.0));

        apply_scf_384(&sci, 2, &mut grbuf);
        assert!(grbuf[..12].iter().all(|&v| v == 8.0 * scale));
        assert!(grbuf[12..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_grouped_quantization() {
        // 3 级分组量化: 码字 = v0 + 3 * v1 + 9 * v2
        let sci = ScaleInfo {
            total_bands: 1,
            stereo_bands: 0,
            bitalloc: {
                let mut ba = [0u8; 64];
                ba[0] = 17;
                ba
            },
            ..ScaleInfo::default()
        };
        let mut bw = BitWriter::new();
        for _ in 0..4 {
            bw.write_bits(2 + 3 * 1 + 9 * 0, 5);
        }
        let data = bw.finish();
        let mut bs = BitReader::new(&data);
        let mut grbuf = vec![0f32; 1152];
        assert_eq!(dequantize_granule(&mut grbuf, &mut bs, &sci, 3), 12);
        assert_eq!(&grbuf[..3], &[1.0, 0.0, -1.0]);
        assert_eq!(&grbuf[9..12], &[1.0, 0.0, -1.0]);
        assert_eq!(bs.position(), 20);
    }

    #[test]
    fn test_joint_stereo_copies_upper_bands() {
        let mut sci = ScaleInfo {
            total_bands: 2,
            stereo_bands: 1,
            ..ScaleInfo::default()
        };
        sci.scf.fill(2.0);
        let mut grbuf = vec![0f32; 1152];
        grbuf[18..30].fill(1.5);
        apply_scf_384(&sci, 0, &mut grbuf);
        assert_eq!(grbuf[18], 3.0);
        assert_eq!(grbuf[576 + 18], 3.0);
        assert_eq!(grbuf[576], 0.0);
    }
}
