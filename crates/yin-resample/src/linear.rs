//! 线性插值采样率转换.
//!
//! 维护一个两帧的 "bin": 前一帧与后一帧. 每输出一帧按小数游标 `alpha`
//! 在两帧之间插值, 然后 `alpha += 输入采样率 / 输出采样率`; `alpha` 的整数部分
//! 即需要从缓存中消耗的新帧数.
//!
//! 输入采样率与输出相同时直接透传, 输出与数据源逐位一致.

use log::trace;

use crate::FrameSource;
use crate::cache::FrameCache;

/// 支持的最大声道数
pub const MAX_CHANNELS: usize = 2;

/// 线性插值重采样器
#[derive(Debug, Clone)]
pub struct LinearResampler {
    channels: usize,
    sample_rate_out: u32,
    /// `[前一帧, 后一帧]`, 每帧 `channels` 个样本
    bin: [f32; 2 * MAX_CHANNELS],
    alpha: f64,
    prev_loaded: bool,
    next_loaded: bool,
    cache: FrameCache,
}

#[inline]
fn mix(x: f32, y: f32, a: f32) -> f32 {
    x * (1.0 - a) + y * a
}

impl LinearResampler {
    /// 创建重采样器, 声道数限制在 1..=2
    pub fn new(channels: usize, sample_rate_out: u32) -> Self {
        let channels = channels.clamp(1, MAX_CHANNELS);
        Self {
            channels,
            sample_rate_out,
            bin: [0.0; 2 * MAX_CHANNELS],
            alpha: 0.0,
            prev_loaded: false,
            next_loaded: false,
            cache: FrameCache::new(channels),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn sample_rate_out(&self) -> u32 {
        self.sample_rate_out
    }

    /// 清空插值状态与缓存
    pub fn reset(&mut self) {
        self.bin = [0.0; 2 * MAX_CHANNELS];
        self.alpha = 0.0;
        self.prev_loaded = false;
        self.next_loaded = false;
        self.cache.reset();
    }

    /// 读取最多 `frames` 个输出帧到 `out`
    ///
    /// `flush` 为真时, 数据源耗尽后继续用剩余的邻帧插值, 直到两个 bin 槽位都用完.
    /// 返回实际输出的帧数.
    pub fn read_frames<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        out: &mut [f32],
        frames: usize,
        flush: bool,
    ) -> usize {
        let frames = frames.min(out.len() / self.channels);
        if frames == 0 {
            return 0;
        }
        if source.sample_rate() == self.sample_rate_out {
            return source.read_source_frames(out, frames);
        }
        self.read_linear(source, out, frames, flush)
    }

    fn read_linear<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        out: &mut [f32],
        frames: usize,
        flush: bool,
    ) -> usize {
        let ch = self.channels;
        if !self.prev_loaded {
            if self.cache.read_frames(source, &mut self.bin[..ch], 1) == 0 {
                return 0;
            }
            self.prev_loaded = true;
        }
        if !self.next_loaded {
            if self.cache.read_frames(source, &mut self.bin[ch..2 * ch], 1) != 0 {
                self.next_loaded = true;
            } else if !flush {
                return 0;
            }
            // flush 模式下后一帧保持为零, 与单次读取时的尾部输出一致
        }

        let factor = f64::from(source.sample_rate()) / f64::from(self.sample_rate_out);
        let mut total = 0;
        for frame in out.chunks_exact_mut(ch).take(frames) {
            let a = self.alpha as f32;
            for (i, v) in frame.iter_mut().enumerate() {
                *v = mix(self.bin[i], self.bin[ch + i], a);
            }

            self.alpha += factor;
            let advance = self.alpha as u32;
            self.alpha -= f64::from(advance);

            for _ in 0..advance {
                self.bin.copy_within(ch..2 * ch, 0);
                if self.cache.read_frames(source, &mut self.bin[ch..2 * ch], 1) == 0 {
                    self.bin[ch..2 * ch].fill(0.0);
                    if self.next_loaded {
                        self.next_loaded = false;
                    } else if flush {
                        self.prev_loaded = false;
                    }
                    break;
                }
            }

            total += 1;
            if !self.next_loaded && (!flush || !self.prev_loaded) {
                trace!("重采样输入耗尽, 输出 {total} 帧");
                break;
            }
        }
        total
    }
}
