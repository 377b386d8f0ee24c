//! # yin-core
//!
//! Yin 解码器核心库, 提供错误类型与按位读写工具.
//!
//! 本 crate 不依赖任何编解码细节, 供 `yin-codec`, `yin-stream` 等上层 crate 共用.

pub mod bitreader;
pub mod bitwriter;
pub mod error;

// 重导出常用类型
pub use bitreader::BitReader;
pub use bitwriter::BitWriter;
pub use error::{YinError, YinResult};
