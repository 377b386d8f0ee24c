//! 比特流写入器.
//!
//! 按大端位序写入 (MSB first), 与 BitReader 对应.
//!
//! 解码器本身不写码流; 测试和基准用它合成帧头, 边信息和主数据.

/// 比特流写入器
///
/// 位先进入 64 位累加器, 凑满整字节后再落到缓冲区, 高位在前.
///
/// # 示例
/// ```
/// use yin_core::bitwriter::BitWriter;
///
/// let mut bw = BitWriter::new();
/// bw.write_bits(0b1011, 4);
/// bw.write_bits(0b0001, 4);
/// bw.write_bits(0b01010101, 8);
/// let data = bw.finish();
/// assert_eq!(data, vec![0b10110001, 0b01010101]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BitWriter {
    data: Vec<u8>,
    /// 尚未落盘的位, 靠低位对齐
    acc: u64,
    /// `acc` 中的有效位数 (0-7, 写入过程中最多 39)
    pending: u32,
}

impl BitWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预留 `capacity` 字节
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            ..Self::default()
        }
    }

    /// 已写入的总位数
    pub fn bits_written(&self) -> usize {
        self.data.len() * 8 + self.pending as usize
    }

    pub fn write_bit(&mut self, bit: u32) {
        self.write_bits(bit & 1, 1);
    }

    /// 写入 `value` 的低 `n` 位 (最多 32 位)
    pub fn write_bits(&mut self, value: u32, n: u32) {
        debug_assert!(n <= 32, "write_bits: n={n} 超过 32 位");
        if n == 0 {
            return;
        }
        let mask = u64::MAX >> (64 - n);
        self.acc = (self.acc << n) | (u64::from(value) & mask);
        self.pending += n;
        while self.pending >= 8 {
            self.pending -= 8;
            self.data.push((self.acc >> self.pending) as u8);
        }
        self.acc &= (1u64 << self.pending) - 1;
    }

    /// 写入完整字节, 不要求对齐
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        if self.pending == 0 {
            self.data.extend_from_slice(bytes);
            return;
        }
        for &b in bytes {
            self.write_bits(u32::from(b), 8);
        }
    }

    /// 用 0 补齐到字节边界
    pub fn align_to_byte(&mut self) {
        if self.pending > 0 {
            self.write_bits(0, 8 - self.pending);
        }
    }

    /// 补齐并返回字节数据
    pub fn finish(mut self) -> Vec<u8> {
        self.align_to_byte();
        self.data
    }

    /// 补齐后用 0 填充到 `len` 字节并返回; 已超过 `len` 时不截断
    pub fn finish_padded(self, len: usize) -> Vec<u8> {
        let mut data = self.finish();
        if data.len() < len {
            data.resize(len, 0);
        }
        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bitreader::BitReader;

    #[test]
    fn test_write_bits_basic() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b1011, 4);
        bw.write_bits(0b0001, 4);
        let data = bw.finish();
        assert_eq!(data, vec![0b10110001]);
    }

    #[test]
    fn test_write_bits_32_bit() {
        let mut bw = BitWriter::new();
        bw.write_bits(0xFF00FF00, 32);
        assert_eq!(bw.bits_written(), 32);
        let data = bw.finish();
        assert_eq!(data, vec![0xFF, 0x00, 0xFF, 0x00]);
    }

    #[test]
    fn test_align_to_byte() {
        let mut bw = BitWriter::new();
        bw.write_bits(0b101, 3);
        bw.align_to_byte();
        bw.write_bits(0xFF, 8);
        let data = bw.finish();
        assert_eq!(data, vec![0b10100000, 0xFF]);
    }

    #[test]
    fn test_write_bytes_unaligned() {
        let mut bw = BitWriter::new();
        bw.write_bit(1);
        bw.write_bytes(&[0x00, 0xFF]);
        let data = bw.finish();
        assert_eq!(data, vec![0x80, 0x7F, 0x80]);
    }

    #[test]
    fn test_finish_padded() {
        let mut bw = BitWriter::with_capacity(8);
        bw.write_bits(0xFFF, 12);
        assert_eq!(bw.clone().finish_padded(4), vec![0xFF, 0xF0, 0, 0]);
        assert_eq!(bw.finish_padded(1), vec![0xFF, 0xF0]);
    }

    #[test]
    fn test_side_info_layout_readback() {
        // 模拟 MPEG-1 单声道边信息前几个字段
        let mut bw = BitWriter::new();
        bw.write_bits(300, 9); // main_data_begin
        bw.write_bits(0, 5); // private_bits
        bw.write_bits(0b1010, 4); // scfsi
        bw.write_bits(1234, 12); // part2_3_length
        let data = bw.finish();

        let mut br = BitReader::new(&data);
        assert_eq!(br.get_bits(9), 300);
        assert_eq!(br.get_bits(5), 0);
        assert_eq!(br.get_bits(4), 0b1010);
        assert_eq!(br.get_bits(12), 1234);
        assert!(!br.is_overrun());
    }
}
