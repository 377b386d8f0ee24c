//! 解码流配置.

use serde::{Deserialize, Serialize};

/// 默认输出声道数
pub const DEFAULT_CHANNELS: u32 = 2;
/// 默认输出采样率
pub const DEFAULT_SAMPLE_RATE: u32 = 44100;
/// 默认输入缓冲区上限
pub const DEFAULT_MAX_BUFFER_BYTES: usize = i32::MAX as usize;

/// 解码流配置
///
/// 非法取值不会被拒绝, 而是在创建解码流时规整:
/// 声道数 0 或大于 2 时取 2, 采样率 0 时取 44100, 缓冲区上限 0 时取默认值.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    /// 输出声道数 (1 或 2)
    pub output_channels: u32,
    /// 输出采样率 (Hz)
    pub output_sample_rate: u32,
    /// 输入缓冲区最大字节数, 超出后解码流终止
    pub max_buffer_bytes: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            output_channels: DEFAULT_CHANNELS,
            output_sample_rate: DEFAULT_SAMPLE_RATE,
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
        }
    }
}

impl DecoderConfig {
    pub fn new(output_channels: u32, output_sample_rate: u32) -> Self {
        Self {
            output_channels,
            output_sample_rate,
            ..Self::default()
        }
    }

    /// 规整后的配置
    pub fn normalized(self) -> Self {
        let output_channels = match self.output_channels {
            1 => 1,
            _ => DEFAULT_CHANNELS,
        };
        let output_sample_rate = match self.output_sample_rate {
            0 => DEFAULT_SAMPLE_RATE,
            r => r,
        };
        let max_buffer_bytes = match self.max_buffer_bytes {
            0 => DEFAULT_MAX_BUFFER_BYTES,
            n => n,
        };
        Self {
            output_channels,
            output_sample_rate,
            max_buffer_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_clamps() {
        let cfg = DecoderConfig {
            output_channels: 6,
            output_sample_rate: 0,
            max_buffer_bytes: 0,
        }
        .normalized();
        assert_eq!(cfg, DecoderConfig::default());
        assert_eq!(DecoderConfig::new(0, 22050).normalized().output_channels, 2);
        assert_eq!(DecoderConfig::new(1, 22050).normalized().output_channels, 1);
    }

    #[test]
    fn test_json_partial_fields() {
        let cfg: DecoderConfig = serde_json::from_str(r#"{"output_sample_rate": 48000}"#).unwrap();
        assert_eq!(cfg.output_sample_rate, 48000);
        assert_eq!(cfg.output_channels, DEFAULT_CHANNELS);
        assert_eq!(cfg.max_buffer_bytes, DEFAULT_MAX_BUFFER_BYTES);

        let text = serde_json::to_string(&DecoderConfig::new(1, 8000)).unwrap();
        let back: DecoderConfig = serde_json::from_str(&text).unwrap();
        assert_eq!(back.output_channels, 1);
    }
}
