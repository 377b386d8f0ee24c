//! # yin-resample
//!
//! Yin 解码器的采样率与声道转换.
//!
//! 本 crate 提供:
//! - 声道转换 (单声道 <-> 立体声) 与 16 位整数到 f32 的归一化
//! - 采样率转换 (线性插值, 带 512 帧预读缓存)
//!
//! 重采样器不持有数据源, 每次读取时由调用方借出实现了 [`FrameSource`] 的对象,
//! 数据源的采样率可以在帧之间变化.

mod cache;
mod convert;
mod linear;

pub use cache::{CACHE_SIZE_IN_FRAMES, FrameCache};
pub use convert::mix_channels_to_f32;
pub use linear::{LinearResampler, MAX_CHANNELS};

/// 交错 f32 帧数据源
pub trait FrameSource {
    /// 每帧声道数
    fn channels(&self) -> usize;

    /// 当前输入采样率, 随解码的帧更新
    fn sample_rate(&self) -> u32;

    /// 读取最多 `frames` 帧到 `out`, 返回实际读取的帧数, 0 表示数据源已耗尽
    fn read_source_frames(&mut self, out: &mut [f32], frames: usize) -> usize;
}
