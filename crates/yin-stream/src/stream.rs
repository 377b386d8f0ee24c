//! 拉取式解码流.
//!
//! [`Mp3Stream`] 持有一个可增长的输入缓冲区, 按需从 [`ByteSource`] 读取数据,
//! 反复调用 [`FrameDecoder`], 并通过 [`LinearResampler`] 输出目标采样率的
//! 交错 f32 PCM.
//!
//! 状态流转: 填充 -> 解码 -> 填充 (循环) -> 结束. 每次解码前保证缓冲区内
//! 至少有一个 16 KiB 数据块; 解码成功后把已消耗的前缀移出缓冲区.
//! 数据源返回 0 字节表示流结束, 缓冲区扩容失败或超出上限则永久终止.

use log::{debug, error};
use yin_codec::{FrameDecoder, MAX_SAMPLES_PER_FRAME};
use yin_core::{YinError, YinResult};
use yin_resample::{FrameSource, LinearResampler, mix_channels_to_f32};

use crate::config::DecoderConfig;
use crate::io::{ByteSource, SeekOrigin};

/// 每次向数据源请求的数据块大小
pub const DATA_CHUNK_SIZE: usize = 16 * 1024;

/// 丢弃模式下的临时缓冲区样本数
const DISCARD_BUFFER_SAMPLES: usize = 4096;

/// 帧级读取器: 输入缓冲区 + 单帧解码器 + 当前帧的待输出 PCM
struct FrameReader<S> {
    source: S,
    decoder: FrameDecoder,
    /// 输入缓冲区, 长度即当前容量
    data: Vec<u8>,
    /// 缓冲区中的有效字节数
    data_size: usize,
    max_buffer_bytes: usize,
    pcm: Box<[i16; MAX_SAMPLES_PER_FRAME]>,
    pcm_frames_consumed: usize,
    pcm_frames_remaining: usize,
    frame_channels: usize,
    frame_sample_rate: u32,
    /// 输出声道数
    channels: usize,
    at_end: bool,
    /// 缓冲区分配失败, 定位也无法恢复
    failed: bool,
}

impl<S: ByteSource> FrameReader<S> {
    fn new(source: S, channels: usize, max_buffer_bytes: usize) -> Self {
        Self {
            source,
            decoder: FrameDecoder::new(),
            data: Vec::new(),
            data_size: 0,
            max_buffer_bytes,
            pcm: Box::new([0; MAX_SAMPLES_PER_FRAME]),
            pcm_frames_consumed: 0,
            pcm_frames_remaining: 0,
            frame_channels: 0,
            frame_sample_rate: 0,
            channels,
            at_end: false,
            failed: false,
        }
    }

    /// 把缓冲区容量扩大到 `capacity`
    fn grow_to(&mut self, capacity: usize) -> YinResult<()> {
        if capacity > self.max_buffer_bytes {
            return Err(YinError::OutOfMemory(format!(
                "输入缓冲区需要 {capacity} 字节, 超出上限 {} 字节",
                self.max_buffer_bytes
            )));
        }
        let additional = capacity.saturating_sub(self.data.len());
        self.data.try_reserve(additional).map_err(|e| {
            YinError::OutOfMemory(format!("输入缓冲区扩容到 {capacity} 字节失败: {e}"))
        })?;
        self.data.resize(capacity, 0);
        Ok(())
    }

    fn grow_or_fail(&mut self, capacity: usize) -> bool {
        match self.grow_to(capacity) {
            Ok(()) => true,
            Err(e) => {
                error!("{e}");
                self.at_end = true;
                self.failed = true;
                false
            }
        }
    }

    /// 从数据源读取到缓冲区空闲部分, 返回读取的字节数
    fn fill(&mut self) -> usize {
        let n = self.source.read(&mut self.data[self.data_size..]);
        self.data_size += n;
        n
    }

    /// 解码下一个有输出的帧, 返回每声道样本数; 0 表示流已结束
    fn decode_next_frame(&mut self) -> usize {
        if self.at_end {
            return 0;
        }
        loop {
            if self.data_size < DATA_CHUNK_SIZE {
                if self.data.len() < DATA_CHUNK_SIZE && !self.grow_or_fail(DATA_CHUNK_SIZE) {
                    return 0;
                }
                if self.fill() == 0 && self.data_size == 0 {
                    self.at_end = true;
                    return 0;
                }
            }

            let info = self
                .decoder
                .decode_frame(&self.data[..self.data_size], Some(&mut *self.pcm));

            if info.frame_bytes > 0 {
                self.data.copy_within(info.frame_bytes..self.data_size, 0);
                self.data_size -= info.frame_bytes;
            }

            if info.samples > 0 {
                self.pcm_frames_consumed = 0;
                self.pcm_frames_remaining = info.samples;
                self.frame_channels = info.channels as usize;
                self.frame_sample_rate = info.hz;
                return info.samples;
            }

            if info.frame_bytes == 0 {
                // 数据不足以确认一帧: 扩容后继续读取
                if self.data_size == self.data.len() {
                    let capacity = self.data.len() + DATA_CHUNK_SIZE;
                    if !self.grow_or_fail(capacity) {
                        return 0;
                    }
                }
                if self.fill() == 0 {
                    self.at_end = true;
                    return 0;
                }
            }
        }
    }

    /// 回到数据开头并清空全部状态
    fn rewind(&mut self) -> bool {
        if self.failed || !self.source.seek(0, SeekOrigin::Start) {
            return false;
        }
        self.decoder.reset();
        self.data_size = 0;
        self.pcm_frames_consumed = 0;
        self.pcm_frames_remaining = 0;
        self.at_end = false;
        true
    }
}

impl<S: ByteSource> FrameSource for FrameReader<S> {
    fn channels(&self) -> usize {
        self.channels
    }

    fn sample_rate(&self) -> u32 {
        self.frame_sample_rate
    }

    fn read_source_frames(&mut self, out: &mut [f32], frames: usize) -> usize {
        let ch = self.channels;
        let mut total = 0;
        while total < frames {
            if self.pcm_frames_remaining > 0 {
                let n = self.pcm_frames_remaining.min(frames - total);
                let fc = self.frame_channels;
                let start = self.pcm_frames_consumed * fc;
                mix_channels_to_f32(&self.pcm[start..], fc, &mut out[total * ch..], ch, n);
                self.pcm_frames_consumed += n;
                self.pcm_frames_remaining -= n;
                total += n;
                continue;
            }
            if self.decode_next_frame() == 0 {
                break;
            }
        }
        total
    }
}

/// MPEG 音频解码流
///
/// # 示例
/// ```no_run
/// use yin_stream::{DecoderConfig, FileSource, Mp3Stream};
///
/// let source = FileSource::open("input.mp3")?;
/// let mut stream = Mp3Stream::new(source, DecoderConfig::default())?;
/// let mut pcm = vec![0f32; 1024 * stream.channels() as usize];
/// while stream.read_frames(1024, Some(&mut pcm[..])) > 0 {
///     // 处理 pcm
/// }
/// # Ok::<(), yin_core::YinError>(())
/// ```
pub struct Mp3Stream<S: ByteSource> {
    reader: FrameReader<S>,
    resampler: LinearResampler,
    config: DecoderConfig,
    current_frame: u64,
}

impl<S: ByteSource> Mp3Stream<S> {
    /// 创建解码流并解码第一帧
    ///
    /// 找不到任何可解码的帧时返回 [`YinError::InvalidData`],
    /// 缓冲区上限小于一个数据块时返回 [`YinError::OutOfMemory`].
    pub fn new(source: S, config: DecoderConfig) -> YinResult<Self> {
        let config = config.normalized();
        let channels = config.output_channels as usize;
        let mut reader = FrameReader::new(source, channels, config.max_buffer_bytes);
        reader.grow_to(DATA_CHUNK_SIZE)?;
        if reader.decode_next_frame() == 0 {
            return Err(YinError::InvalidData("未找到可解码的 MPEG 音频帧".into()));
        }
        debug!(
            "解码流已打开: 输入 {} Hz {} 声道, 输出 {} Hz {} 声道",
            reader.frame_sample_rate, reader.frame_channels, config.output_sample_rate, channels
        );
        Ok(Self {
            reader,
            resampler: LinearResampler::new(channels, config.output_sample_rate),
            config,
            current_frame: 0,
        })
    }

    /// 输出声道数
    pub fn channels(&self) -> u32 {
        self.config.output_channels
    }

    /// 输出采样率
    pub fn sample_rate(&self) -> u32 {
        self.config.output_sample_rate
    }

    /// 规整后的配置
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// 自流开头 (或最近一次定位) 以来已输出的帧数
    pub fn frames_decoded(&self) -> u64 {
        self.current_frame
    }

    /// 当前 MPEG 帧的输入采样率
    pub fn input_sample_rate(&self) -> u32 {
        self.reader.frame_sample_rate
    }

    /// 当前 MPEG 帧的声道数
    pub fn input_channels(&self) -> u32 {
        self.reader.frame_channels as u32
    }

    /// 流是否已结束
    pub fn is_at_end(&self) -> bool {
        self.reader.at_end && self.reader.pcm_frames_remaining == 0
    }

    /// 读取最多 `frames` 个输出帧
    ///
    /// `out` 为 `None` 时解码后丢弃. 返回实际输出的帧数, 0 表示流已结束.
    pub fn read_frames(&mut self, frames: u64, out: Option<&mut [f32]>) -> u64 {
        let ch = self.reader.channels;
        let Some(out) = out else {
            let mut temp = [0f32; DISCARD_BUFFER_SAMPLES];
            let per_read = (DISCARD_BUFFER_SAMPLES / ch) as u64;
            let mut total = 0;
            while total < frames {
                let want = (frames - total).min(per_read);
                let got = self.read_frames(want, Some(&mut temp[..]));
                if got == 0 {
                    break;
                }
                total += got;
            }
            return total;
        };

        let frames = frames.min((out.len() / ch) as u64) as usize;
        let got = self
            .resampler
            .read_frames(&mut self.reader, out, frames, true) as u64;
        self.current_frame += got;
        got
    }

    /// 定位到第 `index` 个输出帧
    ///
    /// 回到数据开头, 清空全部状态, 再解码并丢弃 `index` 帧. 数据源不支持
    /// 定位, 或流在 `index` 之前结束时返回 `false`.
    pub fn seek_to_frame(&mut self, index: u64) -> bool {
        if !self.reader.rewind() {
            return false;
        }
        self.resampler.reset();
        self.current_frame = 0;
        if self.reader.decode_next_frame() == 0 {
            return index == 0;
        }
        let skipped = self.read_frames(index, None);
        debug!("定位到第 {index} 帧, 实际跳过 {skipped} 帧");
        skipped == index
    }

    /// 消耗解码流, 取回数据源
    pub fn into_inner(self) -> S {
        self.reader.source
    }
}
