//! 比特流读取器.
//!
//! 从字节缓冲区中按位读取数据, 大端位序 (MSB first).
//!
//! 与通用读取器不同, 越过 `limit` 的读取不会报错: 返回 0, 但游标照常前进.
//! 调用方在一段数据解析完成后比较 [`BitReader::position`] 与
//! [`BitReader::limit`] 来判断是否越界. Layer III 依赖这一行为对
//! 不完整的最后一个 granule 做隐式补零.

/// 比特流读取器
///
/// # 示例
/// ```
/// use yin_core::bitreader::BitReader;
///
/// let data = [0b10110001, 0b01010101];
/// let mut br = BitReader::new(&data);
/// assert_eq!(br.get_bits(4), 0b1011);
/// assert_eq!(br.get_bits(4), 0b0001);
/// assert_eq!(br.get_bits(8), 0b01010101);
/// // 越界读取返回 0
/// assert_eq!(br.get_bits(3), 0);
/// assert!(br.is_overrun());
/// ```
#[derive(Debug, Clone)]
pub struct BitReader<'a> {
    /// 源数据
    data: &'a [u8],
    /// 当前位位置
    pos: usize,
    /// 可读位数上限
    limit: usize,
}

impl<'a> BitReader<'a> {
    /// 创建新的比特流读取器, 上限为整个缓冲区
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            limit: data.len() * 8,
        }
    }

    /// 读取 `n` 位 (1..=32), 越过上限时返回 0
    pub fn get_bits(&mut self, n: u32) -> u32 {
        let s = (self.pos & 7) as i32;
        let mut shl = n as i32 + s;
        let mut p = self.pos >> 3;

        self.pos += n as usize;
        if self.pos > self.limit {
            return 0;
        }

        let mut next = u32::from(self.byte_at(p)) & (255 >> s);
        p += 1;
        let mut cache = 0u32;
        loop {
            shl -= 8;
            if shl <= 0 {
                break;
            }
            cache |= next << shl;
            next = u32::from(self.byte_at(p));
            p += 1;
        }
        cache | (next >> (-shl) as u32)
    }

    /// 读取 1 位并作为布尔值返回
    pub fn get_flag(&mut self) -> bool {
        self.get_bits(1) != 0
    }

    /// 跳过 `n` 位
    pub fn skip_bits(&mut self, n: usize) {
        self.pos += n;
    }

    /// 当前位位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 直接设置位位置
    pub fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// 可读位数上限
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 游标是否已越过上限
    pub fn is_overrun(&self) -> bool {
        self.pos > self.limit
    }

    /// 剩余可读位数 (越界时为 0)
    pub fn bits_left(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    /// 底层数据
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    fn byte_at(&self, index: usize) -> u8 {
        self.data.get(index).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_bits_basic() {
        let data = [0b1011_0001, 0b0101_0101];
        let mut br = BitReader::new(&data);
        assert_eq!(br.get_bits(1), 1);
        assert_eq!(br.get_bits(3), 0b011);
        assert_eq!(br.get_bits(8), 0b0001_0101);
        assert_eq!(br.position(), 12);
        assert_eq!(br.bits_left(), 4);
    }

    #[test]
    fn test_get_bits_32_unaligned() {
        let data = [0x80, 0xFF, 0x00, 0xFF, 0x01];
        let mut br = BitReader::new(&data);
        br.get_bits(1);
        // 0000000 11111111 00000000 11111111 0
        assert_eq!(br.get_bits(32), 0x01FE_01FE);
        assert_eq!(br.position(), 33);
    }

    #[test]
    fn test_overread_returns_zero() {
        let data = [0xFF];
        let mut br = BitReader::new(&data);
        assert_eq!(br.get_bits(6), 0b11_1111);
        assert!(!br.is_overrun());
        // 跨越上限的读取整体返回 0, 游标仍然前进
        assert_eq!(br.get_bits(4), 0);
        assert_eq!(br.position(), 10);
        assert!(br.is_overrun());
        assert_eq!(br.bits_left(), 0);
        assert_eq!(br.get_bits(8), 0);
    }

    #[test]
    fn test_empty_buffer() {
        let mut br = BitReader::new(&[]);
        assert_eq!(br.limit(), 0);
        assert_eq!(br.get_bits(16), 0);
        assert!(br.is_overrun());
    }

    #[test]
    fn test_skip_and_flag() {
        let data = [0b0100_0000];
        let mut br = BitReader::new(&data);
        br.skip_bits(1);
        assert!(br.get_flag());
        assert!(!br.get_flag());
        br.set_position(0);
        assert_eq!(br.get_bits(2), 0b01);
    }
}
