//! Layer III 边信息 (Side Information) 解析.
//!
//! 边信息紧跟帧头 (和可选 CRC), 长度固定:
//! MPEG-1 单声道 17 字节, 双声道 32 字节; MPEG-2/2.5 为 9 / 17 字节.

use yin_core::BitReader;

use crate::header::{FrameHeader, SHORT_BLOCK_TYPE};
use crate::tables::{SCF_LONG, SCF_MIXED, SCF_SHORT};

/// big_values 上限 (576 / 2)
pub const MAX_BIG_VALUES: u32 = 288;

/// 单个 (granule, 声道) 的边信息
#[derive(Debug, Clone, Copy)]
pub struct GranuleInfo {
    /// 比例因子频带宽度表 (以 0 结尾)
    pub sfb_table: &'static [u8],
    pub part_23_length: u32,
    pub big_values: u32,
    pub scalefac_compress: u32,
    pub global_gain: u8,
    pub block_type: u8,
    pub mixed_block_flag: bool,
    /// 长块频带数
    pub n_long_sfb: usize,
    /// 短块频带数 (按窗口展开后)
    pub n_short_sfb: usize,
    pub table_select: [u8; 3],
    /// 各 region 包含的频带数减 1, 255 表示直到 big_values 结束
    pub region_count: [u8; 3],
    pub subblock_gain: [u8; 3],
    pub preflag: bool,
    pub scalefac_scale: u8,
    pub count1_table: bool,
    /// 比例因子复用标志 (MPEG-1), 高位对应第一组频带
    pub scfsi: u8,
}

impl Default for GranuleInfo {
    fn default() -> Self {
        Self {
            sfb_table: &SCF_LONG[0],
            part_23_length: 0,
            big_values: 0,
            scalefac_compress: 0,
            global_gain: 0,
            block_type: 0,
            mixed_block_flag: false,
            n_long_sfb: 22,
            n_short_sfb: 0,
            table_select: [0; 3],
            region_count: [0; 3],
            subblock_gain: [0; 3],
            preflag: false,
            scalefac_scale: 0,
            count1_table: false,
            scfsi: 0,
        }
    }
}

/// 读取全部 granule 的边信息, 返回 `main_data_begin`
///
/// 顺序为 `[gr0 ch0, gr0 ch1, gr1 ch0, gr1 ch1]` (单声道时连续排列).
/// 以下情况返回 `None`: `big_values > 288`, 开启窗口切换但 `block_type == 0`,
/// 或 part_23_length 总和超出本帧剩余数据加上比特储备可提供的长度.
pub fn read_side_info(
    bs: &mut BitReader<'_>,
    gr: &mut [GranuleInfo; 4],
    hdr: &FrameHeader,
) -> Option<usize> {
    let mut sr_idx = hdr.full_sample_rate_index();
    if sr_idx != 0 {
        sr_idx -= 1;
    }
    let mpeg1 = hdr.is_mpeg1();
    let mono = hdr.is_mono();
    let mut gr_count = if mono { 1 } else { 2 };
    let mut scfsi = 0u32;
    let main_data_begin;

    if mpeg1 {
        gr_count *= 2;
        main_data_begin = bs.get_bits(9) as usize;
        // 私有位与 scfsi 一起读取
        scfsi = bs.get_bits(7 + gr_count as u32);
    } else {
        main_data_begin = (bs.get_bits(8 + gr_count as u32) >> gr_count) as usize;
    }

    let mut part_23_sum = 0usize;
    for g in gr.iter_mut().take(gr_count) {
        if mono {
            scfsi <<= 4;
        }
        g.part_23_length = bs.get_bits(12);
        part_23_sum += g.part_23_length as usize;
        g.big_values = bs.get_bits(9);
        if g.big_values > MAX_BIG_VALUES {
            return None;
        }
        g.global_gain = bs.get_bits(8) as u8;
        g.scalefac_compress = bs.get_bits(if mpeg1 { 4 } else { 9 });
        g.sfb_table = &SCF_LONG[sr_idx];
        g.n_long_sfb = 22;
        g.n_short_sfb = 0;

        let tables;
        if bs.get_flag() {
            g.block_type = bs.get_bits(2) as u8;
            if g.block_type == 0 {
                return None;
            }
            g.mixed_block_flag = bs.get_flag();
            g.region_count = [7, 255, 255];
            if g.block_type == SHORT_BLOCK_TYPE {
                scfsi &= 0x0F0F;
                if !g.mixed_block_flag {
                    g.region_count[0] = 8;
                    g.sfb_table = &SCF_SHORT[sr_idx];
                    g.n_long_sfb = 0;
                    g.n_short_sfb = 39;
                } else {
                    g.sfb_table = &SCF_MIXED[sr_idx];
                    g.n_long_sfb = if mpeg1 { 8 } else { 6 };
                    g.n_short_sfb = 30;
                }
            }
            // 窗口切换时只传两个 table_select
            tables = bs.get_bits(10) << 5;
            for gain in &mut g.subblock_gain {
                *gain = bs.get_bits(3) as u8;
            }
        } else {
            g.block_type = 0;
            g.mixed_block_flag = false;
            tables = bs.get_bits(15);
            g.region_count[0] = bs.get_bits(4) as u8;
            g.region_count[1] = bs.get_bits(3) as u8;
            g.region_count[2] = 255;
        }
        g.table_select = [
            (tables >> 10) as u8,
            ((tables >> 5) & 31) as u8,
            (tables & 31) as u8,
        ];
        g.preflag = if mpeg1 {
            bs.get_flag()
        } else {
            g.scalefac_compress >= 500
        };
        g.scalefac_scale = bs.get_bits(1) as u8;
        g.count1_table = bs.get_flag();
        g.scfsi = ((scfsi >> 12) & 15) as u8;
        scfsi <<= 4;
    }

    if part_23_sum + bs.position() > bs.limit() + main_data_begin * 8 {
        return None;
    }
    Some(main_data_begin)
}
