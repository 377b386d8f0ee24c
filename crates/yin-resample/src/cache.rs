//! 预读缓存.
//!
//! 线性插值每次只向前取一帧, 直接逐帧调用数据源开销过大.
//! 缓存一次从数据源取最多 512 帧, 再逐帧分发.

use crate::FrameSource;

/// 单次从数据源读取的最大帧数
pub const CACHE_SIZE_IN_FRAMES: usize = 512;

/// 缓存容量 (样本数)
const CACHE_SAMPLES: usize = 2 * CACHE_SIZE_IN_FRAMES;

/// 交错 f32 帧缓存
#[derive(Debug, Clone)]
pub struct FrameCache {
    frames: Box<[f32; CACHE_SAMPLES]>,
    channels: usize,
    cached: usize,
    next: usize,
}

impl FrameCache {
    pub fn new(channels: usize) -> Self {
        Self {
            frames: Box::new([0.0; CACHE_SAMPLES]),
            channels: channels.max(1),
            cached: 0,
            next: 0,
        }
    }

    /// 丢弃已缓存的帧
    pub fn reset(&mut self) {
        self.cached = 0;
        self.next = 0;
    }

    /// 缓存中剩余的帧数
    pub fn available(&self) -> usize {
        self.cached - self.next
    }

    /// 读取 `frames` 帧到 `out`, 缓存耗尽时从 `source` 补充
    ///
    /// 返回实际读取的帧数, 少于 `frames` 说明数据源已耗尽.
    pub fn read_frames<S: FrameSource + ?Sized>(
        &mut self,
        source: &mut S,
        out: &mut [f32],
        frames: usize,
    ) -> usize {
        let ch = self.channels;
        let mut remaining = frames;
        let mut total = 0;
        while remaining > 0 {
            let n = remaining.min(self.available());
            out[total * ch..(total + n) * ch]
                .copy_from_slice(&self.frames[self.next * ch..(self.next + n) * ch]);
            self.next += n;
            total += n;
            remaining -= n;
            if remaining == 0 {
                break;
            }

            self.next = 0;
            let request = (CACHE_SAMPLES / ch).min(CACHE_SIZE_IN_FRAMES);
            self.cached = source.read_source_frames(&mut self.frames[..], request);
            if self.cached == 0 {
                break;
            }
        }
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::VecSource;

    #[test]
    fn test_reads_through_cache() {
        let data: Vec<f32> = (0..1200).map(|v| v as f32).collect();
        let mut src = VecSource::new(data, 2, 44100);
        let mut cache = FrameCache::new(2);
        let mut out = [0f32; 6];
        assert_eq!(cache.read_frames(&mut src, &mut out, 3), 3);
        assert_eq!(out, [0.0, 1.0, 2.0, 3.0, 4.0, 5.0]);
        // 一次补充 512 帧
        assert_eq!(src.reads, 1);
        assert_eq!(cache.available(), 509);
    }

    #[test]
    fn test_refill_across_boundary() {
        let data: Vec<f32> = (0..10).map(|v| v as f32).collect();
        let mut src = VecSource::new(data, 1, 8000);
        src.max_per_read = 4;
        let mut cache = FrameCache::new(1);
        let mut out = [0f32; 10];
        assert_eq!(cache.read_frames(&mut src, &mut out, 10), 10);
        assert_eq!(out[9], 9.0);
        assert_eq!(src.reads, 3);
        // 数据源耗尽
        assert_eq!(cache.read_frames(&mut src, &mut out, 1), 0);
    }

    #[test]
    fn test_reset_drops_cached_frames() {
        let mut src = VecSource::new(vec![1.0; 8], 1, 8000);
        let mut cache = FrameCache::new(1);
        let mut out = [0f32; 1];
        cache.read_frames(&mut src, &mut out, 1);
        assert_eq!(cache.available(), 7);
        cache.reset();
        assert_eq!(cache.available(), 0);
    }
}
