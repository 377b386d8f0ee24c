//! Layer III Huffman 解码与反量化.
//!
//! 码表采用紧凑的多级查找树 (见 [`crate::huffman_tables`]): 每次先窥视 5 位,
//! 负值表项指向下一级子表, 正值表项的高字节为码长, 低 8 位为两个 4 位数值.
//! 解码结果直接乘以所在频带的比例因子增益, 输出到 576 点频谱.

use yin_core::BitReader;

use crate::huffman_tables::{LINBITS, TAB32, TAB33, TAB_INDEX, TABS};
use crate::side_info::GranuleInfo;
use crate::tables::POW43;

/// 32 位预取缓存
///
/// `cache` 的最高位始终对齐到下一个未消费的位, `sh` 记录距离下一次
/// 补充字节的位数 (非负时需要补充).
struct BitCache<'a> {
    buf: &'a [u8],
    next: usize,
    cache: u32,
    sh: i32,
}

impl<'a> BitCache<'a> {
    fn new(buf: &'a [u8], pos: usize) -> Self {
        let next = pos / 8;
        let byte = |i: usize| u32::from(buf.get(i).copied().unwrap_or(0));
        let word = (byte(next) << 24) | (byte(next + 1) << 16) | (byte(next + 2) << 8) | byte(next + 3);
        Self {
            buf,
            next: next + 4,
            cache: word << (pos & 7),
            sh: (pos & 7) as i32 - 8,
        }
    }

    #[inline]
    fn peek(&self, n: u32) -> u32 {
        self.cache >> (32 - n)
    }

    #[inline]
    fn flush(&mut self, n: u32) {
        self.cache <<= n;
        self.sh += n as i32;
    }

    #[inline]
    fn refill(&mut self) {
        while self.sh >= 0 {
            let b = u32::from(self.buf.get(self.next).copied().unwrap_or(0));
            self.cache |= b << self.sh;
            self.next += 1;
            self.sh -= 8;
        }
    }

    /// 下一个符号位是否为负
    #[inline]
    fn sign_negative(&self) -> bool {
        (self.cache as i32) < 0
    }

    /// 已消费到的绝对位位置
    fn position(&self) -> usize {
        ((self.next * 8) as isize - 24 + self.sh as isize) as usize
    }
}

/// 计算 `x^(4/3)`, 大于 128 的值通过查表加二阶插值得到
pub fn pow_43(mut x: i32) -> f32 {
    if x < 129 {
        return POW43[16 + x as usize];
    }
    let mut mult = 256.0f32;
    if x < 1024 {
        mult = 16.0;
        x <<= 3;
    }
    let sign = (2 * x) & 64;
    let frac = ((x & 63) - sign) as f32 / ((x & !63) + sign) as f32;
    POW43[16 + ((x + sign) >> 6) as usize] * (1.0 + frac * ((4.0 / 3.0) + frac * (2.0 / 9.0))) * mult
}

/// 解码一个 (granule, 声道) 的频谱系数
///
/// `dst` 为该声道的 576 点缓冲区 (调用方预先清零), `scf` 为各频带增益.
/// `limit` 是本 granule 数据结束的绝对位位置; 返回时 `bs` 定位到该位置.
pub fn decode_huffman(
    dst: &mut [f32],
    bs: &mut BitReader<'_>,
    gr: &GranuleInfo,
    scf: &[f32],
    limit: usize,
) {
    let mut bc = BitCache::new(bs.data(), bs.position());
    let sfb = gr.sfb_table;
    let band_pairs = |i: usize| i32::from(sfb.get(i).copied().unwrap_or(0) / 2);
    let mut sfb_i = 0usize;
    let mut scf_i = 0usize;
    let mut out = 0usize;
    let mut one = 0.0f32;
    let mut big_val_cnt = gr.big_values as i32;
    let mut ireg = 0usize;

    'regions: while big_val_cnt > 0 && ireg < 3 {
        let tab_num = usize::from(gr.table_select[ireg]);
        let mut sfb_cnt = i32::from(gr.region_count[ireg]);
        ireg += 1;
        let codebook = &TABS[TAB_INDEX[tab_num]..];
        let linbits = LINBITS[tab_num];

        loop {
            let np = band_pairs(sfb_i);
            sfb_i += 1;
            if np == 0 {
                break 'regions;
            }
            let mut pairs = big_val_cnt.min(np);
            one = scf[scf_i];
            scf_i += 1;
            while pairs > 0 {
                let mut w = 5;
                let mut leaf = i32::from(codebook[bc.peek(w) as usize]);
                while leaf < 0 {
                    bc.flush(w);
                    w = (leaf & 7) as u32;
                    leaf = i32::from(codebook[(bc.peek(w) as i32 - (leaf >> 3)) as usize]);
                }
                bc.flush((leaf >> 8) as u32);

                for _ in 0..2 {
                    let lsb = leaf & 0x0F;
                    if linbits != 0 && lsb == 15 {
                        let value = lsb + bc.peek(linbits) as i32;
                        bc.flush(linbits);
                        bc.refill();
                        let sign = if bc.sign_negative() { -1.0 } else { 1.0 };
                        dst[out] = one * pow_43(value) * sign;
                    } else {
                        let idx = 16 + lsb as usize - 16 * (bc.cache >> 31) as usize;
                        dst[out] = POW43[idx] * one;
                    }
                    bc.flush(u32::from(lsb != 0));
                    out += 1;
                    leaf >>= 4;
                }
                bc.refill();
                pairs -= 1;
            }
            big_val_cnt -= np;
            sfb_cnt -= 1;
            if big_val_cnt <= 0 || sfb_cnt < 0 {
                break;
            }
        }
    }

    // count1 区: 每个码字给出 4 个绝对值不超过 1 的系数
    let codebook: &[u8] = if gr.count1_table { &TAB33 } else { &TAB32 };
    let mut np = 1 - big_val_cnt.min(0);
    'quads: loop {
        let mut leaf = u32::from(codebook[bc.peek(4) as usize]);
        if leaf & 8 == 0 {
            let sub = (bc.cache << 4) >> (32 - (leaf & 3));
            leaf = u32::from(codebook[(leaf >> 3) as usize + sub as usize]);
        }
        bc.flush(leaf & 7);
        if bc.position() > limit {
            break;
        }
        for half in 0..2 {
            np -= 1;
            if np == 0 {
                np = band_pairs(sfb_i);
                sfb_i += 1;
                if np == 0 {
                    break 'quads;
                }
                one = scf[scf_i];
                scf_i += 1;
            }
            for s in half * 2..half * 2 + 2 {
                if leaf & (128 >> s) != 0 {
                    dst[out + s] = if bc.sign_negative() { -one } else { one };
                    bc.flush(1);
                }
            }
        }
        bc.refill();
        out += 4;
    }

    bs.set_position(limit);
}
