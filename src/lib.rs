//! # Yin (音)
//!
//! 纯 Rust 实现的 MPEG-1/2/2.5 Layer I/II/III 音频解码库.
//!
//! - **逐帧解码**: 标量浮点实现, 输出 16 位 PCM
//! - **拉取式解码流**: 从任意字节源读取交织 f32 PCM, 支持按 PCM 帧定位
//! - **格式转换**: 单声道/立体声互转与线性插值重采样
//!
//! # 快速开始
//!
//! ```rust
//! use yin::stream::{DecoderConfig, MemorySource, Mp3Stream};
//!
//! // 没有任何 MPEG 帧的数据无法创建解码流
//! let data = [0u8; 64];
//! let result = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::default());
//! assert!(result.is_err());
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `yin-core` | 错误类型, 按位读写 |
//! | `yin-codec` | 帧同步与逐帧解码 |
//! | `yin-resample` | 声道转换与线性重采样 |
//! | `yin-stream` | 字节源与拉取式解码流 |

/// 核心类型与工具
pub use yin_core as core;

/// 逐帧解码器
pub use yin_codec as codec;

/// 声道转换与重采样
pub use yin_resample as resample;

/// 拉取式解码流
pub use yin_stream as stream;

pub use yin_codec::{FrameDecoder, FrameInfo, MAX_SAMPLES_PER_FRAME};
pub use yin_core::{YinError, YinResult};
pub use yin_stream::{DecoderConfig, Mp3Stream};

/// 获取 Yin 版本号
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
