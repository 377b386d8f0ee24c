//! 32 位浮点 WAV 写入器.
//!
//! 写入流程:
//! 1. `new()` - 写入 RIFF 和 fmt 块, data 块大小先写 0
//! 2. `write_samples()` - 追加交织的 f32 样本
//! 3. `finish()` - 回填 RIFF 大小和 data 块大小

use std::io::{Seek, SeekFrom, Write};

use anyhow::{Result, bail};
use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

/// WAV 音频格式码: IEEE 浮点
const WAV_FORMAT_IEEE_FLOAT: u16 = 0x0003;
const BITS_PER_SAMPLE: u16 = 32;
/// RIFF 大小字段偏移
const RIFF_SIZE_OFFSET: u64 = 4;
/// data 块大小字段偏移: 12 (RIFF) + 24 (fmt) + 4 (data tag)
const DATA_SIZE_OFFSET: u64 = 40;

pub struct WavWriter<W: Write + Seek> {
    out: W,
    data_written: u64,
}

impl<W: Write + Seek> WavWriter<W> {
    pub fn new(mut out: W, channels: u16, sample_rate: u32) -> Result<Self> {
        if channels == 0 || sample_rate == 0 {
            bail!("无效的 WAV 参数: {channels} 声道, {sample_rate} Hz");
        }
        let block_align = channels * (BITS_PER_SAMPLE / 8);
        let byte_rate = sample_rate * u32::from(block_align);

        out.write_all(b"RIFF")?;
        out.write_u32::<LittleEndian>(0)?;
        out.write_all(b"WAVE")?;

        out.write_all(b"fmt ")?;
        out.write_u32::<LittleEndian>(16)?;
        out.write_u16::<LittleEndian>(WAV_FORMAT_IEEE_FLOAT)?;
        out.write_u16::<LittleEndian>(channels)?;
        out.write_u32::<LittleEndian>(sample_rate)?;
        out.write_u32::<LittleEndian>(byte_rate)?;
        out.write_u16::<LittleEndian>(block_align)?;
        out.write_u16::<LittleEndian>(BITS_PER_SAMPLE)?;

        out.write_all(b"data")?;
        out.write_u32::<LittleEndian>(0)?;

        debug!("WAV 头部: {sample_rate} Hz, {channels} 声道, f32");
        Ok(Self {
            out,
            data_written: 0,
        })
    }

    pub fn write_samples(&mut self, samples: &[f32]) -> Result<()> {
        write_f32_samples(&mut self.out, samples)?;
        self.data_written += samples.len() as u64 * 4;
        Ok(())
    }

    /// 回填大小字段, 返回底层写入器
    pub fn finish(mut self) -> Result<W> {
        let data_size = u32::try_from(self.data_written)
            .ok()
            .filter(|&n| n <= u32::MAX - 36);
        let Some(data_size) = data_size else {
            bail!("WAV 数据超过 4 GiB: {} 字节", self.data_written);
        };
        self.out.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
        self.out.write_u32::<LittleEndian>(36 + data_size)?;
        self.out.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.out.write_u32::<LittleEndian>(data_size)?;
        self.out.seek(SeekFrom::End(0))?;
        self.out.flush()?;
        debug!("WAV 尾部: data_size={data_size}");
        Ok(self.out)
    }
}

/// 以小端 f32 写出样本
pub fn write_f32_samples<W: Write>(out: &mut W, samples: &[f32]) -> std::io::Result<()> {
    for &s in samples {
        out.write_f32::<LittleEndian>(s)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use byteorder::ReadBytesExt;
    use std::io::{Cursor, Read};

    #[test]
    fn test_wav_header_and_sizes() {
        let mut wav = WavWriter::new(Cursor::new(Vec::new()), 2, 48000).unwrap();
        wav.write_samples(&[0.0, 0.5, -0.5, 1.0]).unwrap();
        let bytes = wav.finish().unwrap().into_inner();
        assert_eq!(bytes.len(), 44 + 16);

        let mut r = Cursor::new(&bytes);
        let mut tag = [0u8; 4];
        r.read_exact(&mut tag).unwrap();
        assert_eq!(&tag, b"RIFF");
        assert_eq!(r.read_u32::<LittleEndian>().unwrap(), 36 + 16);
        r.set_position(20);
        assert_eq!(r.read_u16::<LittleEndian>().unwrap(), WAV_FORMAT_IEEE_FLOAT);
        assert_eq!(r.read_u16::<LittleEndian>().unwrap(), 2);
        assert_eq!(r.read_u32::<LittleEndian>().unwrap(), 48000);
        assert_eq!(r.read_u32::<LittleEndian>().unwrap(), 48000 * 8);
        r.set_position(DATA_SIZE_OFFSET);
        assert_eq!(r.read_u32::<LittleEndian>().unwrap(), 16);
        r.set_position(44 + 4);
        assert_eq!(r.read_f32::<LittleEndian>().unwrap(), 0.5);
    }

    #[test]
    fn test_wav_rejects_zero_channels() {
        assert!(WavWriter::new(Cursor::new(Vec::new()), 0, 44100).is_err());
    }
}
