//! # yin-stream
//!
//! 拉取式 MPEG 音频解码流: 从任意字节源读取, 输出目标声道数与采样率的
//! 交错 f32 PCM (范围 [-1, 1]).
//!
//! ## 使用示例
//!
//! ```rust,no_run
//! use yin_stream::{DecoderConfig, MemorySource, Mp3Stream};
//!
//! let bytes = std::fs::read("input.mp3")?;
//! let mut stream = Mp3Stream::new(MemorySource::new(&bytes), DecoderConfig::new(2, 48000))?;
//! let mut pcm = vec![0f32; 4096 * 2];
//! let frames = stream.read_frames(4096, Some(&mut pcm[..]));
//! stream.seek_to_frame(0);
//! # let _ = frames;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
pub mod io;
pub mod stream;

// 重导出常用类型
pub use config::DecoderConfig;
pub use io::{ByteSource, FileSource, IoSource, MemorySource, SeekOrigin};
pub use stream::{DATA_CHUNK_SIZE, Mp3Stream};
