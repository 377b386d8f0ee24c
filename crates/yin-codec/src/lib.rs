//! # yin-codec
//!
//! MPEG-1/2/2.5 Layer I/II/III 音频解码器, 输出交织的 16 位 PCM.
//!
//! 各解码阶段按模块划分, 由 [`FrameDecoder`] 串联:
//!
//! - 帧同步与帧头: [`header`]
//! - Layer III 边信息, 比例因子, Huffman: [`side_info`], [`scalefactor`], [`huffman`]
//! - Layer I/II 位分配与反量化: [`layer12`]
//! - 立体声, 重排序, 抗混叠, IMDCT: [`stereo`], [`reorder`], [`alias`], [`imdct`]
//! - 多相合成滤波器: [`synthesis`]
//! - 比特储备: [`bit_reservoir`]
//!
//! ## 使用示例
//!
//! ```rust
//! use yin_codec::{FrameDecoder, MAX_SAMPLES_PER_FRAME};
//!
//! let mut decoder = FrameDecoder::new();
//! let mut pcm = [0i16; MAX_SAMPLES_PER_FRAME];
//! // 不足一个帧头的数据不会被消耗
//! let info = decoder.decode_frame(&[0xFF, 0xFB, 0x90], Some(&mut pcm));
//! assert_eq!(info.frame_bytes, 0);
//! assert_eq!(info.samples, 0);
//! ```

pub mod alias;
pub mod bit_reservoir;
pub mod decoder;
pub mod header;
pub mod huffman;
pub mod huffman_tables;
pub mod imdct;
pub mod layer12;
pub mod reorder;
pub mod scalefactor;
pub mod side_info;
pub mod stereo;
pub mod synthesis;
pub mod tables;

// 重导出常用类型
pub use decoder::{DecoderState, FrameDecoder, FrameInfo, MAX_SAMPLES_PER_FRAME};
pub use header::{ChannelMode, FrameHeader, MpegVersion, find_frame};
