//! 帧统计.
//!
//! 逐帧扫描整段数据, 只解析帧头 (不解码音频), 汇总层, 采样率, 码率与时长.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;
use yin_codec::FrameDecoder;

/// 探测结果
#[derive(Debug, Default, Serialize)]
pub struct ProbeReport {
    pub frames: u64,
    /// 每声道样本总数
    pub samples: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f64>,
    pub layers: BTreeSet<u32>,
    pub sample_rates: BTreeSet<u32>,
    pub channels: BTreeSet<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate_kbps: Option<BitrateStats>,
    /// 帧之间跳过的非音频字节
    pub skipped_bytes: u64,
    pub total_bytes: u64,
}

/// 码率统计 (kbps), 自由格式帧不计入
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BitrateStats {
    pub min: u32,
    pub max: u32,
    pub average: f64,
}

impl ProbeReport {
    /// 所有帧码率相同时视为 CBR
    pub fn is_constant_bitrate(&self) -> bool {
        self.bitrate_kbps.is_some_and(|b| b.min == b.max)
    }
}

/// 扫描数据中的全部帧
pub fn probe(data: &[u8]) -> ProbeReport {
    let mut decoder = FrameDecoder::new();
    let mut report = ProbeReport {
        total_bytes: data.len() as u64,
        ..ProbeReport::default()
    };
    let mut duration = 0.0f64;
    let mut bitrate_sum = 0u64;
    let mut bitrate_frames = 0u64;
    let mut bitrate_range: Option<(u32, u32)> = None;

    let mut pos = 0;
    while pos < data.len() {
        let info = decoder.decode_frame(&data[pos..], None);
        if info.frame_bytes == 0 {
            break;
        }
        pos += info.frame_bytes;
        if info.samples == 0 {
            report.skipped_bytes += info.frame_bytes as u64;
            continue;
        }
        report.skipped_bytes += info.frame_offset as u64;
        report.frames += 1;
        report.samples += info.samples as u64;
        duration += info.samples as f64 / f64::from(info.hz);
        report.layers.insert(info.layer);
        report.sample_rates.insert(info.hz);
        report.channels.insert(info.channels);

        if info.bitrate_kbps > 0 {
            bitrate_sum += u64::from(info.bitrate_kbps);
            bitrate_frames += 1;
            bitrate_range = Some(match bitrate_range {
                Some((lo, hi)) => (lo.min(info.bitrate_kbps), hi.max(info.bitrate_kbps)),
                None => (info.bitrate_kbps, info.bitrate_kbps),
            });
        }
    }
    report.skipped_bytes += (data.len() - pos.min(data.len())) as u64;

    if report.frames > 0 {
        report.duration_secs = Some(duration);
    }
    report.bitrate_kbps = bitrate_range.map(|(min, max)| BitrateStats {
        min,
        max,
        average: bitrate_sum as f64 / bitrate_frames as f64,
    });
    report
}

fn join(set: &BTreeSet<u32>) -> String {
    set.iter().map(u32::to_string).collect::<Vec<_>>().join(", ")
}

impl fmt::Display for ProbeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "帧数:     {}", self.frames)?;
        writeln!(f, "层:       {}", join(&self.layers))?;
        writeln!(f, "采样率:   {} Hz", join(&self.sample_rates))?;
        writeln!(f, "声道:     {}", join(&self.channels))?;
        match self.bitrate_kbps {
            Some(b) if self.is_constant_bitrate() => writeln!(f, "码率:     {} kbps (CBR)", b.min)?,
            Some(b) => writeln!(
                f,
                "码率:     {}-{} kbps, 平均 {:.1} kbps (VBR)",
                b.min, b.max, b.average
            )?,
            None => writeln!(f, "码率:     自由格式")?,
        }
        if let Some(d) = self.duration_secs {
            writeln!(f, "时长:     {d:.3} 秒 ({} 样本/声道)", self.samples)?;
        }
        write!(
            f,
            "字节:     {} (跳过 {})",
            self.total_bytes, self.skipped_bytes
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 128 kbps, 44.1 kHz, 单声道, 无填充的 Layer III 帧, 主数据全零
    fn silent_frames(count: usize) -> Vec<u8> {
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0xC0]);
        frame.repeat(count)
    }

    #[test]
    fn test_probe_counts_frames() {
        let mut data = vec![0x55u8; 10];
        data.extend(silent_frames(4));
        let report = probe(&data);
        assert_eq!(report.frames, 4);
        assert_eq!(report.samples, 4 * 1152);
        assert_eq!(report.skipped_bytes, 10);
        assert_eq!(report.layers.iter().copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(report.sample_rates.iter().copied().collect::<Vec<_>>(), vec![44100]);
        assert!(report.is_constant_bitrate());
        let d = report.duration_secs.unwrap();
        assert!((d - 4.0 * 1152.0 / 44100.0).abs() < 1e-9);
    }

    #[test]
    fn test_probe_no_frames() {
        let report = probe(&[0u8; 100]);
        assert_eq!(report.frames, 0);
        assert!(report.duration_secs.is_none());
        assert!(report.bitrate_kbps.is_none());
        assert_eq!(report.skipped_bytes, 100);
    }

    #[test]
    fn test_probe_json_fields() {
        let json = serde_json::to_value(probe(&silent_frames(3))).unwrap();
        assert_eq!(json["frames"], 3);
        assert_eq!(json["bitrate_kbps"]["min"], 128);
        assert_eq!(json["channels"][0], 1);
    }
}
