//! Layer III 比特储备 (Bit Reservoir)
//!
//! 一帧的主数据可以从前面若干帧的尾部开始 (`main_data_begin` 字节之前).
//! 每帧解码结束后把未消费的主数据尾部 (最多 511 字节) 保存下来,
//! 下一帧解码前与新帧的主数据拼接.

use yin_core::BitReader;

use crate::header::MAX_FREE_FORMAT_FRAME_SIZE;

/// 储备区最大字节数 (9 位 `main_data_begin`)
pub const MAX_RESERVOIR_BYTES: usize = 511;

/// 拼接后主数据的最大长度
pub const MAIN_DATA_LEN: usize = MAX_RESERVOIR_BYTES + MAX_FREE_FORMAT_FRAME_SIZE;

#[derive(Debug, Clone)]
pub struct BitReservoir {
    buf: [u8; MAX_RESERVOIR_BYTES],
    len: usize,
}

impl Default for BitReservoir {
    fn default() -> Self {
        Self::new()
    }
}

impl BitReservoir {
    pub fn new() -> Self {
        Self {
            buf: [0; MAX_RESERVOIR_BYTES],
            len: 0,
        }
    }

    /// 当前保存的字节数
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    /// 拼接储备数据与当前帧主数据
    ///
    /// `frame` 需已读完边信息. 返回覆盖拼接结果的读取器, 以及储备是否足够
    /// 提供 `main_data_begin` 字节. 不足时仍返回读取器, 但本帧不应输出样本.
    pub fn restore<'a>(
        &self,
        main_data: &'a mut [u8; MAIN_DATA_LEN],
        frame: &BitReader<'_>,
        main_data_begin: usize,
    ) -> (BitReader<'a>, bool) {
        let frame_start = frame.position() / 8;
        let frame_bytes = frame.limit().saturating_sub(frame.position()) / 8;
        let borrowed = self.len.min(main_data_begin);
        let skip = self.len.saturating_sub(main_data_begin);

        main_data[..borrowed].copy_from_slice(&self.buf[skip..skip + borrowed]);
        let frame_bytes = frame_bytes.min(MAIN_DATA_LEN - borrowed);
        main_data[borrowed..borrowed + frame_bytes]
            .copy_from_slice(&frame.data()[frame_start..frame_start + frame_bytes]);

        let main_data: &'a [u8] = main_data;
        let reader = BitReader::new(&main_data[..borrowed + frame_bytes]);
        (reader, self.len >= main_data_begin)
    }

    /// 保存主数据读取器中尚未消费的尾部字节
    pub fn save(&mut self, bs: &BitReader<'_>) {
        let data = bs.data();
        let mut pos = bs.position().div_ceil(8);
        let end = bs.limit() / 8;
        if pos >= end {
            self.len = 0;
            return;
        }
        let mut remains = end - pos;
        if remains > MAX_RESERVOIR_BYTES {
            pos += remains - MAX_RESERVOIR_BYTES;
            remains = MAX_RESERVOIR_BYTES;
        }
        self.buf[..remains].copy_from_slice(&data[pos..pos + remains]);
        self.len = remains;
    }
}
