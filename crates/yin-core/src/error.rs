//! 统一错误类型定义.
//!
//! 所有 Yin crate 共用的错误类型, 支持跨模块传播.
//!
//! 码流损坏不会走到这里: 帧级错误由解码器就地恢复 (重新同步或输出静音),
//! 只有初始化失败, I/O 失败和缓冲区无法扩容才会以错误形式返回.

use thiserror::Error;

/// Yin 统一错误类型
#[derive(Debug, Error)]
pub enum YinError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 不支持的操作
    #[error("不支持的操作: {0}")]
    Unsupported(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 内存分配失败
    #[error("内存分配失败: {0}")]
    OutOfMemory(String),

    /// 无效数据 (找不到任何有效帧等)
    #[error("无效数据: {0}")]
    InvalidData(String),
}

/// Yin 统一 Result 类型
pub type YinResult<T> = Result<T, YinError>;
