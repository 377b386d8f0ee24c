//! 集成测试公共工具: 基于 BitWriter 合成 MPEG 音频帧.

#![allow(dead_code)]

use yin::codec::FrameHeader;
use yin::core::BitWriter;

/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, 单声道
pub const L3_MONO: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];
/// MPEG-1 Layer III, 128 kbps, 44.1 kHz, 立体声
pub const L3_STEREO: [u8; 4] = [0xFF, 0xFB, 0x90, 0x00];
/// MPEG-1 Layer I, 288 kbps, 44.1 kHz, 单声道
pub const L1_MONO: [u8; 4] = [0xFF, 0xFF, 0x90, 0xC0];

fn frame_size(hdr: [u8; 4]) -> usize {
    let h = FrameHeader::new(hdr);
    h.frame_bytes(0) + h.padding()
}

/// 边信息与主数据全零的 Layer III 静音帧
pub fn silent_l3_frames(hdr: [u8; 4], count: usize) -> Vec<u8> {
    let mut frame = hdr.to_vec();
    frame.resize(frame_size(hdr), 0);
    frame.repeat(count)
}

/// Layer I 单声道帧: 子带 0 分配 4 位, 12 个样本都取 `level`
pub fn layer1_tone_frames(level: u32, count: usize) -> Vec<u8> {
    let mut bw = BitWriter::new();
    bw.write_bytes(&L1_MONO);
    bw.write_bits(3, 4);
    for _ in 1..32 {
        bw.write_bits(0, 4);
    }
    bw.write_bits(20, 6);
    for _ in 0..12 {
        bw.write_bits(level, 4);
    }
    bw.finish_padded(frame_size(L1_MONO)).repeat(count)
}

/// count1 区编码的 Layer III 单声道帧
///
/// 每个 granule 含四个 count1 四元组 (count1 表 B): 第 `k` 帧在
/// 系数 `k % 8` 与 `k % 8 + 5` 处各有一个 ±1 值, 全局增益为 `global_gain`.
pub fn count1_l3_frames(global_gain: u32, count: usize) -> Vec<u8> {
    let size = frame_size(L3_MONO);
    let mut out = Vec::with_capacity(size * count);
    for k in 0..count {
        let (quads, bits) = count1_main_data(k);

        let mut bw = BitWriter::with_capacity(size);
        bw.write_bytes(&L3_MONO);
        // main_data_begin, private, scfsi
        bw.write_bits(0, 9 + 5 + 4);
        for _ in 0..2 {
            bw.write_bits(bits, 12); // part2_3_length
            bw.write_bits(0, 9); // big_values
            bw.write_bits(global_gain, 8);
            bw.write_bits(0, 4); // scalefac_compress
            bw.write_bit(0); // window_switching
            bw.write_bits(0, 15); // table_select
            bw.write_bits(0, 4 + 3); // region0/1 count
            bw.write_bits(0, 2); // preflag, scalefac_scale
            bw.write_bit(1); // count1 表 B
        }
        for _ in 0..2 {
            for &(code, len) in &quads {
                bw.write_bits(code, len);
            }
        }
        out.extend(bw.finish_padded(size));
    }
    out
}

/// 返回 (码字, 位数) 序列与总位数
fn count1_main_data(k: usize) -> (Vec<(u32, u32)>, u32) {
    let mut coeffs = [0u8; 16];
    coeffs[k % 8] = 1;
    coeffs[k % 8 + 5] = 1;
    let mut quads = Vec::new();
    let mut bits = 0;
    let mut negative = k % 2 == 1;
    for quad in coeffs.chunks(4) {
        let value = quad.iter().fold(0u32, |acc, &c| (acc << 1) | u32::from(c));
        quads.push((15 - value, 4));
        bits += 4;
        for _ in quad.iter().filter(|&&c| c != 0) {
            quads.push((u32::from(negative), 1));
            bits += 1;
            negative = !negative;
        }
    }
    (quads, bits)
}

/// 解码全部帧, 返回交织的 16 位 PCM
pub fn decode_all(data: &[u8]) -> Vec<i16> {
    let mut decoder = yin::FrameDecoder::new();
    let mut pcm = [0i16; yin::MAX_SAMPLES_PER_FRAME];
    let mut out = Vec::new();
    let mut pos = 0;
    while pos < data.len() {
        let info = decoder.decode_frame(&data[pos..], Some(&mut pcm));
        if info.frame_bytes == 0 {
            break;
        }
        out.extend_from_slice(&pcm[..info.samples * info.channels as usize]);
        pos += info.frame_bytes;
    }
    out
}

/// 16 位 PCM 的 FNV-1a 64 位摘要 (按小端字节序)
pub fn pcm_digest(pcm: &[i16]) -> u64 {
    pcm.iter()
        .flat_map(|s| s.to_le_bytes())
        .fold(0xcbf2_9ce4_8422_2325, |h, b| {
            (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
        })
}

/// xorshift32, 测试用的确定性伪随机数
pub struct XorShift(pub u32);

impl XorShift {
    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.0 = x;
        x
    }

    pub fn below(&mut self, n: usize) -> usize {
        self.next_u32() as usize % n
    }
}
