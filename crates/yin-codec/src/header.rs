//! MPEG 音频帧头解析与帧同步.
//!
//! 帧头为 4 字节:
//!
//! ```text
//! AAAAAAAA AAABBCCD EEEEFFGH IIJJKLMM
//! A: 同步字 (11 位)   B: 版本   C: Layer   D: 无 CRC 标志
//! E: 比特率索引       F: 采样率索引        G: 填充   H: 私有位
//! I: 声道模式         J: 模式扩展          K/L/M: 版权, 原版, 加重
//! ```
//!
//! 帧同步 ([`find_frame`]) 逐字节扫描, 候选帧头必须得到后续帧头的确认,
//! 或恰好用完剩余数据, 才会被接受. 自由格式 (比特率索引 0) 的帧长通过
//! 在不同步长上探测两个一致的帧头推导, 并缓存在解码器状态中.

use log::debug;

use crate::tables::{HALFRATE, SAMPLE_RATE_HZ};

/// 帧头字节数
pub const HDR_SIZE: usize = 4;
/// 自由格式帧最大字节数
pub const MAX_FREE_FORMAT_FRAME_SIZE: usize = 2304;
/// 接受一个候选帧头前需要确认的后续帧数上限
pub const MAX_FRAME_SYNC_MATCHES: usize = 10;

/// 短块类型
pub const SHORT_BLOCK_TYPE: u8 = 2;
/// 结束块类型
pub const STOP_BLOCK_TYPE: u8 = 3;

/// MPEG 版本
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MpegVersion {
    Mpeg1,
    Mpeg2,
    Mpeg25,
}

/// 声道模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    Stereo,
    JointStereo,
    DualChannel,
    Mono,
}

/// MPEG 音频帧头
///
/// 保存原始 4 字节, 所有字段按需从字节中取出.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameHeader([u8; HDR_SIZE]);

impl FrameHeader {
    /// 由 4 字节构造 (不做校验)
    pub const fn new(bytes: [u8; HDR_SIZE]) -> Self {
        Self(bytes)
    }

    /// 读取缓冲区开头的 4 字节, 不足 4 字节时返回 `None`
    pub fn read(buf: &[u8]) -> Option<Self> {
        let bytes: [u8; HDR_SIZE] = buf.get(..HDR_SIZE)?.try_into().ok()?;
        Some(Self(bytes))
    }

    /// 原始字节
    pub fn bytes(&self) -> [u8; HDR_SIZE] {
        self.0
    }

    /// 同步字, layer, 比特率索引与采样率索引是否合法
    ///
    /// MPEG-2.5 只接受 Layer III.
    pub fn is_valid(&self) -> bool {
        let h = &self.0;
        h[0] == 0xFF
            && ((h[1] & 0xF0) == 0xF0 || (h[1] & 0xFE) == 0xE2)
            && self.layer_bits() != 0
            && self.bitrate_index() != 15
            && self.sample_rate_index() != 3
    }

    /// `other` 是否合法, 并与本帧头的版本, layer, 采样率和自由格式标志一致
    pub fn matches(&self, other: &FrameHeader) -> bool {
        let (h1, h2) = (&self.0, &other.0);
        other.is_valid()
            && ((h1[1] ^ h2[1]) & 0xFE) == 0
            && ((h1[2] ^ h2[2]) & 0x0C) == 0
            && self.is_free_format() == other.is_free_format()
    }

    fn layer_bits(&self) -> u8 {
        (self.0[1] >> 1) & 3
    }

    /// Layer 编号 (1, 2, 3)
    pub fn layer(&self) -> u32 {
        4 - u32::from(self.layer_bits())
    }

    /// 是否为 Layer I
    pub fn is_layer1(&self) -> bool {
        (self.0[1] & 6) == 6
    }

    /// 比特率索引 (0 表示自由格式)
    pub fn bitrate_index(&self) -> usize {
        usize::from(self.0[2] >> 4)
    }

    /// 采样率索引 (0..=2)
    pub fn sample_rate_index(&self) -> usize {
        usize::from((self.0[2] >> 2) & 3)
    }

    /// 跨版本的采样率序号: MPEG-2.5 为 0..=2, MPEG-2 为 3..=5, MPEG-1 为 6..=8
    pub fn full_sample_rate_index(&self) -> usize {
        let h1 = self.0[1];
        self.sample_rate_index() + usize::from(((h1 >> 3) & 1) + ((h1 >> 4) & 1)) * 3
    }

    /// 是否为 MPEG-1
    pub fn is_mpeg1(&self) -> bool {
        self.0[1] & 0x08 != 0
    }

    /// 是否为 MPEG-2.5
    pub fn is_mpeg25(&self) -> bool {
        self.0[1] & 0x10 == 0
    }

    /// MPEG 版本
    pub fn version(&self) -> MpegVersion {
        if self.is_mpeg1() {
            MpegVersion::Mpeg1
        } else if self.is_mpeg25() {
            MpegVersion::Mpeg25
        } else {
            MpegVersion::Mpeg2
        }
    }

    /// 是否带 16 位 CRC
    pub fn has_crc(&self) -> bool {
        self.0[1] & 1 == 0
    }

    /// 填充位
    pub fn has_padding(&self) -> bool {
        self.0[2] & 0x2 != 0
    }

    /// 是否为自由格式
    pub fn is_free_format(&self) -> bool {
        (self.0[2] & 0xF0) == 0
    }

    /// 声道模式
    pub fn channel_mode(&self) -> ChannelMode {
        match (self.0[3] >> 6) & 3 {
            0 => ChannelMode::Stereo,
            1 => ChannelMode::JointStereo,
            2 => ChannelMode::DualChannel,
            _ => ChannelMode::Mono,
        }
    }

    /// 模式扩展 (联合立体声下: bit1 = MS, bit0 = 强度立体声)
    pub fn mode_extension(&self) -> u8 {
        (self.0[3] >> 4) & 3
    }

    /// 单声道
    pub fn is_mono(&self) -> bool {
        (self.0[3] & 0xC0) == 0xC0
    }

    /// 联合立体声且启用 MS
    pub fn is_ms_stereo(&self) -> bool {
        (self.0[3] & 0xE0) == 0x60
    }

    /// MS 位 (不检查声道模式)
    pub fn test_ms_stereo(&self) -> bool {
        self.0[3] & 0x20 != 0
    }

    /// 强度立体声位 (不检查声道模式)
    pub fn test_intensity_stereo(&self) -> bool {
        self.0[3] & 0x10 != 0
    }

    /// 声道数
    pub fn channels(&self) -> u32 {
        if self.is_mono() { 1 } else { 2 }
    }

    /// 每帧 576 个样本 (MPEG-2/2.5 Layer III)
    pub fn is_frame_576(&self) -> bool {
        (self.0[1] & 14) == 2
    }

    /// 比特率 (kbps), 自由格式为 0
    pub fn bitrate_kbps(&self) -> u32 {
        let mpeg1 = usize::from(self.is_mpeg1());
        let layer = usize::from(self.layer_bits()) - 1;
        2 * u32::from(HALFRATE[mpeg1][layer][self.bitrate_index()])
    }

    /// 采样率 (Hz)
    pub fn sample_rate_hz(&self) -> u32 {
        SAMPLE_RATE_HZ[self.sample_rate_index()]
            >> u32::from(!self.is_mpeg1())
            >> u32::from(self.is_mpeg25())
    }

    /// 每声道样本数
    pub fn frame_samples(&self) -> usize {
        if self.is_layer1() {
            384
        } else {
            1152 >> usize::from(self.is_frame_576())
        }
    }

    /// 帧长 (不含填充), 自由格式时返回 `free_format_size`
    pub fn frame_bytes(&self, free_format_size: usize) -> usize {
        let mut frame_bytes =
            self.frame_samples() * self.bitrate_kbps() as usize * 125 / self.sample_rate_hz() as usize;
        if self.is_layer1() {
            // slot 对齐
            frame_bytes &= !3;
        }
        if frame_bytes != 0 {
            frame_bytes
        } else {
            free_format_size
        }
    }

    /// 填充字节数 (Layer I 一个 slot 为 4 字节)
    pub fn padding(&self) -> usize {
        if self.has_padding() {
            if self.is_layer1() { 4 } else { 1 }
        } else {
            0
        }
    }
}

fn header_at(buf: &[u8], pos: usize) -> FrameHeader {
    buf.get(pos..).and_then(FrameHeader::read).unwrap_or_default()
}

/// 检查从 `buf` 开头起的连续帧是否都与首帧头一致
///
/// 最多检查 [`MAX_FRAME_SYNC_MATCHES`] 帧; 数据提前用完时, 只要已确认至少一帧即视为匹配.
pub fn match_frame(buf: &[u8], frame_bytes: usize) -> bool {
    let first = header_at(buf, 0);
    let mut i = 0usize;
    for nmatch in 0..MAX_FRAME_SYNC_MATCHES {
        let hdr = header_at(buf, i);
        i += hdr.frame_bytes(frame_bytes) + hdr.padding();
        if i + HDR_SIZE > buf.len() {
            return nmatch > 0;
        }
        if !first.matches(&header_at(buf, i)) {
            return false;
        }
    }
    true
}

/// 在 `buf` 中查找第一个可信的帧
///
/// 返回 `(偏移, 含填充的帧长)`; 找不到时返回 `(buf.len(), 0)`.
/// 自由格式帧长探测成功时写入 `free_format_bytes`, 候选被拒绝时清零.
pub fn find_frame(buf: &[u8], free_format_bytes: &mut usize) -> (usize, usize) {
    let len = buf.len();
    for i in 0..len.saturating_sub(HDR_SIZE) {
        let hdr = header_at(buf, i);
        if !hdr.is_valid() {
            continue;
        }

        let mut frame_bytes = hdr.frame_bytes(*free_format_bytes);
        let mut frame_and_padding = frame_bytes + hdr.padding();

        let mut k = HDR_SIZE;
        while frame_bytes == 0 && k < MAX_FREE_FORMAT_FRAME_SIZE && i + 2 * k < len - HDR_SIZE {
            if hdr.matches(&header_at(buf, i + k)) {
                let fb = k - hdr.padding();
                let next_fb = fb + header_at(buf, i + k).padding();
                if i + k + next_fb + HDR_SIZE <= len && hdr.matches(&header_at(buf, i + k + next_fb)) {
                    frame_and_padding = k;
                    frame_bytes = fb;
                    *free_format_bytes = fb;
                    debug!("检测到自由格式帧, 帧长 {fb} 字节");
                }
            }
            k += 1;
        }

        if (frame_bytes != 0 && i + frame_and_padding <= len && match_frame(&buf[i..], frame_bytes))
            || (i == 0 && frame_and_padding == len)
        {
            if i > 0 {
                debug!("跳过 {i} 字节后重新同步");
            }
            return (i, frame_and_padding);
        }
        *free_format_bytes = 0;
    }
    (len, 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// MPEG-1 Layer III, 128 kbps, 44.1 kHz, 单声道, 无 CRC
    const MP3_128K_MONO: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

    fn cbr_stream(hdr: [u8; 4], frames: usize) -> Vec<u8> {
        let frame_len = FrameHeader::new(hdr).frame_bytes(0);
        let mut out = Vec::new();
        for _ in 0..frames {
            let start = out.len();
            out.extend_from_slice(&hdr);
            out.resize(start + frame_len, 0);
        }
        out
    }

    #[test]
    fn test_header_fields() {
        let h = FrameHeader::new(MP3_128K_MONO);
        assert!(h.is_valid());
        assert_eq!(h.layer(), 3);
        assert_eq!(h.version(), MpegVersion::Mpeg1);
        assert_eq!(h.bitrate_kbps(), 128);
        assert_eq!(h.sample_rate_hz(), 44100);
        assert_eq!(h.channels(), 1);
        assert_eq!(h.channel_mode(), ChannelMode::Mono);
        assert!(!h.has_crc());
        assert_eq!(h.frame_samples(), 1152);
        // 144 * 128000 / 44100 = 417
        assert_eq!(h.frame_bytes(0), 417);
        assert_eq!(h.padding(), 0);
    }

    #[test]
    fn test_mpeg2_and_mpeg25_rates() {
        // MPEG-2 Layer III 64 kbps 22.05 kHz 立体声
        let h = FrameHeader::new([0xFF, 0xF3, 0x80, 0x00]);
        assert!(h.is_valid());
        assert_eq!(h.version(), MpegVersion::Mpeg2);
        assert_eq!(h.sample_rate_hz(), 22050);
        assert_eq!(h.bitrate_kbps(), 64);
        assert_eq!(h.frame_samples(), 576);
        assert_eq!(h.full_sample_rate_index(), 3);

        // MPEG-2.5 8 kHz
        let h = FrameHeader::new([0xFF, 0xE3, 0x18, 0xC0]);
        assert!(h.is_valid());
        assert_eq!(h.version(), MpegVersion::Mpeg25);
        assert_eq!(h.sample_rate_hz(), 8000);
        assert_eq!(h.full_sample_rate_index(), 2);
    }

    #[test]
    fn test_layer1_frame_bytes_slot_aligned() {
        // MPEG-1 Layer I 32 kbps 48 kHz, 带填充
        let h = FrameHeader::new([0xFF, 0xFF, 0x16, 0xC0]);
        assert!(h.is_valid());
        assert_eq!(h.layer(), 1);
        assert_eq!(h.frame_samples(), 384);
        // 384 * 32 * 125 / 48000 = 32
        assert_eq!(h.frame_bytes(0), 32);
        assert_eq!(h.padding(), 4);
    }

    #[test]
    fn test_invalid_headers() {
        // 比特率索引 15
        assert!(!FrameHeader::new([0xFF, 0xFB, 0xF0, 0x00]).is_valid());
        // 采样率索引 3
        assert!(!FrameHeader::new([0xFF, 0xFB, 0x9C, 0x00]).is_valid());
        // layer 0
        assert!(!FrameHeader::new([0xFF, 0xF9, 0x90, 0x00]).is_valid());
        // MPEG-2.5 Layer II 不支持
        assert!(!FrameHeader::new([0xFF, 0xE4, 0x90, 0x00]).is_valid());
        assert!(FrameHeader::read(&[0xFF, 0xFB]).is_none());
    }

    #[test]
    fn test_find_frame_requires_confirmation() {
        let mut buf = vec![0x12, 0x34, 0xFF];
        buf.extend(cbr_stream(MP3_128K_MONO, 3));
        let mut free = 0;
        let (offset, frame_bytes) = find_frame(&buf, &mut free);
        assert_eq!(offset, 3);
        assert_eq!(frame_bytes, 417);

        // 只有一个孤立帧头, 后面没有匹配的帧, 不接受
        let mut lone = MP3_128K_MONO.to_vec();
        lone.resize(1000, 0);
        let (offset, frame_bytes) = find_frame(&lone, &mut free);
        assert_eq!(offset, lone.len());
        assert_eq!(frame_bytes, 0);
    }

    #[test]
    fn test_find_frame_exact_single_frame() {
        let buf = cbr_stream(MP3_128K_MONO, 1);
        let mut free = 0;
        assert_eq!(find_frame(&buf, &mut free), (0, 417));
    }

    #[test]
    fn test_find_frame_short_buffer() {
        let mut free = 0;
        assert_eq!(find_frame(&MP3_128K_MONO, &mut free), (4, 0));
        assert_eq!(find_frame(&[], &mut free), (0, 0));
    }

    #[test]
    fn test_find_frame_free_format() {
        // 自由格式: 比特率索引 0, 帧长 300
        let hdr = [0xFF, 0xFB, 0x00, 0xC0];
        let mut buf = Vec::new();
        for _ in 0..4 {
            let start = buf.len();
            buf.extend_from_slice(&hdr);
            buf.resize(start + 300, 0);
        }
        let mut free = 0;
        let (offset, frame_bytes) = find_frame(&buf, &mut free);
        assert_eq!(offset, 0);
        assert_eq!(frame_bytes, 300);
        assert_eq!(free, 300);
    }

    #[test]
    fn test_match_frame_rejects_mismatch() {
        let mut buf = cbr_stream(MP3_128K_MONO, 2);
        // 第二帧改成 48 kHz
        buf[417 + 2] = 0x94;
        assert!(!match_frame(&buf, 417));
    }
}
