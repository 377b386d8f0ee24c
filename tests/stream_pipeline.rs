//! 端到端集成测试: 合成帧 → 字节源 → 解码流 → f32 PCM.

mod common;

use std::io::Write;

use common::{
    L3_MONO, L3_STEREO, count1_l3_frames, decode_all, layer1_tone_frames, silent_l3_frames,
};
use yin::stream::{ByteSource, DecoderConfig, FileSource, IoSource, MemorySource, Mp3Stream};
use yin::{FrameDecoder, MAX_SAMPLES_PER_FRAME, YinError};

/// 读到流结束, 返回全部交织样本
fn read_to_end<S: ByteSource>(stream: &mut Mp3Stream<S>, chunk: usize) -> Vec<f32> {
    let ch = stream.channels() as usize;
    let mut buf = vec![0f32; chunk * ch];
    let mut out = Vec::new();
    loop {
        let got = stream.read_frames(chunk as u64, Some(&mut buf[..])) as usize;
        if got == 0 {
            break;
        }
        out.extend_from_slice(&buf[..got * ch]);
    }
    out
}

#[test]
fn test_silence_decodes_to_zeros() {
    let data = silent_l3_frames(L3_MONO, 10);
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 44100)).unwrap();
    let pcm = read_to_end(&mut stream, 1000);
    assert_eq!(pcm.len(), 10 * 1152);
    assert!(pcm.iter().all(|&s| s == 0.0));
    assert!(stream.is_at_end());
    assert_eq!(stream.frames_decoded(), 10 * 1152);
}

#[test]
fn test_stream_matches_frame_decoder() {
    let data = count1_l3_frames(180, 12);
    let reference: Vec<f32> = decode_all(&data)
        .iter()
        .map(|&s| f32::from(s) / 32768.0)
        .collect();
    assert_eq!(reference.len(), 12 * 1152);
    assert!(reference.iter().any(|&s| s != 0.0));

    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 44100)).unwrap();
    assert_eq!(read_to_end(&mut stream, 777), reference);
}

#[test]
fn test_decoder_reinit_is_deterministic() {
    let data = count1_l3_frames(190, 6);
    let first = decode_all(&data);
    let second = decode_all(&data);
    assert_eq!(first, second);

    let mut dec = FrameDecoder::new();
    let mut pcm = [0i16; MAX_SAMPLES_PER_FRAME];
    let info = dec.decode_frame(&data, Some(&mut pcm));
    assert_eq!(info.samples, 1152);
    assert_eq!(&pcm[..1152], &first[..1152]);
}

#[test]
fn test_four_byte_buffer_is_not_consumed() {
    let mut dec = FrameDecoder::new();
    let mut pcm = [0i16; MAX_SAMPLES_PER_FRAME];
    let info = dec.decode_frame(&L3_MONO, Some(&mut pcm));
    assert_eq!(info.frame_bytes, 0);
    assert_eq!(info.samples, 0);
}

#[test]
fn test_corrupt_main_data_does_not_panic() {
    let mut data = count1_l3_frames(200, 8);
    // 打乱第 3 帧边信息之后的全部字节
    let size = data.len() / 8;
    let mut x = 0x1234_5678u32;
    for b in &mut data[2 * size + 4..3 * size] {
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        *b = x as u8;
    }
    let pcm = decode_all(&data);
    assert!(pcm.len() <= 8 * 1152);
    assert!(pcm.len() >= 7 * 1152);
}

#[test]
fn test_mono_to_stereo_duplicates() {
    let data = layer1_tone_frames(13, 4);
    let mono: Vec<f32> = decode_all(&data)
        .iter()
        .map(|&s| f32::from(s) / 32768.0)
        .collect();

    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(2, 44100)).unwrap();
    assert_eq!(stream.input_channels(), 1);
    let stereo = read_to_end(&mut stream, 100);
    assert_eq!(stereo.len(), 2 * mono.len());
    for (i, frame) in stereo.chunks_exact(2).enumerate() {
        assert_eq!(frame[0], mono[i]);
        assert_eq!(frame[1], mono[i]);
    }
}

#[test]
fn test_stereo_to_mono_silence() {
    let data = silent_l3_frames(L3_STEREO, 3);
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 44100)).unwrap();
    assert_eq!(stream.input_channels(), 2);
    let pcm = read_to_end(&mut stream, 4096);
    assert_eq!(pcm.len(), 3 * 1152);
    assert!(pcm.iter().all(|&s| s == 0.0));
}

#[test]
fn test_upsample_doubles_length() {
    let data = layer1_tone_frames(9, 5);
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 88200)).unwrap();
    let pcm = read_to_end(&mut stream, 333);
    let expected = 2 * 5 * 384;
    assert!(pcm.len().abs_diff(expected) <= 2, "{} vs {expected}", pcm.len());
}

#[test]
fn test_downsample_halves_length() {
    let data = silent_l3_frames(L3_MONO, 4);
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 22050)).unwrap();
    let pcm = read_to_end(&mut stream, 500);
    let expected = 4 * 1152 / 2;
    assert!(pcm.len().abs_diff(expected) <= 2, "{} vs {expected}", pcm.len());
    assert!(pcm.iter().all(|&s| s == 0.0));
}

#[test]
fn test_seek_matches_linear_decode() {
    let data = count1_l3_frames(185, 9);
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 44100)).unwrap();
    let all = read_to_end(&mut stream, 1024);

    for index in [0u64, 1, 1151, 1152, 5000] {
        assert!(stream.seek_to_frame(index));
        assert_eq!(stream.frames_decoded(), index);
        let rest = read_to_end(&mut stream, 640);
        assert_eq!(rest, all[index as usize..], "index = {index}");
    }

    // 超出末尾的定位失败
    assert!(!stream.seek_to_frame(all.len() as u64 + 1));
}

#[test]
fn test_file_and_io_sources_agree() {
    let data = count1_l3_frames(175, 5);
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&data).unwrap();
    file.flush().unwrap();

    let mut from_file =
        Mp3Stream::new(FileSource::open(file.path()).unwrap(), DecoderConfig::new(1, 44100)).unwrap();
    let mut from_io = Mp3Stream::new(
        IoSource::new(std::io::Cursor::new(data.clone())),
        DecoderConfig::new(1, 44100),
    )
    .unwrap();
    let mut from_memory =
        Mp3Stream::new(MemorySource::from_vec(data), DecoderConfig::new(1, 44100)).unwrap();

    let a = read_to_end(&mut from_file, 1000);
    assert_eq!(a, read_to_end(&mut from_io, 1000));
    assert_eq!(a, read_to_end(&mut from_memory, 1000));
}

#[test]
fn test_leading_junk_larger_than_chunk() {
    let mut data = vec![0u8; 40_000];
    data.extend(silent_l3_frames(L3_MONO, 3));
    let mut stream = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::new(1, 44100)).unwrap();
    assert_eq!(read_to_end(&mut stream, 2048).len(), 3 * 1152);
}

#[test]
fn test_no_frames_is_invalid_data() {
    let data = vec![0x42u8; 20_000];
    let err = Mp3Stream::new(MemorySource::new(&data), DecoderConfig::default())
        .err()
        .unwrap();
    assert!(matches!(err, YinError::InvalidData(_)));
}
