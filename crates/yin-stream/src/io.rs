//! 字节源抽象层.
//!
//! 解码流只需要两种能力: 顺序读取与定位. [`ByteSource`] 把它们抽象成
//! 两个方法, 并提供内存, 文件与任意 `Read + Seek` 对象三种后端.
//!
//! 与 `std::io` 不同, 这里的读取不返回错误: 底层错误会被记录到日志,
//! 并被当作流结束处理, 由解码流进入终止状态.

use std::borrow::Cow;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use log::warn;
use yin_core::YinResult;

/// 定位基准
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekOrigin {
    /// 相对数据开头
    Start,
    /// 相对当前位置
    Current,
}

/// 字节源 trait
///
/// 实现此 trait 以支持不同的数据来源 (内存, 文件, 网络等).
pub trait ByteSource {
    /// 读取数据到 `buf`, 返回读取的字节数, 0 表示数据结束
    fn read(&mut self, buf: &mut [u8]) -> usize;

    /// 定位, 成功返回 `true`
    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool {
        (**self).seek(offset, origin)
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        (**self).read(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool {
        (**self).seek(offset, origin)
    }
}

/// 内存字节源
///
/// 可以持有数据, 也可以借用调用方的切片.
#[derive(Debug, Clone)]
pub struct MemorySource<'a> {
    data: Cow<'a, [u8]>,
    pos: usize,
}

impl<'a> MemorySource<'a> {
    /// 借用已有数据
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data: Cow::Borrowed(data),
            pos: 0,
        }
    }

    /// 当前读取位置
    pub fn position(&self) -> usize {
        self.pos
    }

    /// 数据总长度
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl MemorySource<'static> {
    /// 持有数据
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self {
            data: Cow::Owned(data),
            pos: 0,
        }
    }
}

impl ByteSource for MemorySource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        to_read
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool {
        let base = match origin {
            SeekOrigin::Start => 0,
            SeekOrigin::Current => self.pos as i64,
        };
        match base.checked_add(offset) {
            Some(p) if p >= 0 && p as u64 <= self.data.len() as u64 => {
                self.pos = p as usize;
                true
            }
            _ => false,
        }
    }
}

/// 任意 `Read + Seek` 对象的字节源
#[derive(Debug)]
pub struct IoSource<T> {
    inner: T,
}

impl<T: Read + Seek> IoSource<T> {
    pub fn new(inner: T) -> Self {
        Self { inner }
    }

    /// 取回底层对象
    pub fn into_inner(self) -> T {
        self.inner
    }

    pub fn get_ref(&self) -> &T {
        &self.inner
    }
}

impl<T: Read + Seek> ByteSource for IoSource<T> {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        loop {
            match self.inner.read(buf) {
                Ok(n) => return n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!("读取失败, 按流结束处理: {e}");
                    return 0;
                }
            }
        }
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool {
        let pos = match origin {
            SeekOrigin::Start => match u64::try_from(offset) {
                Ok(o) => SeekFrom::Start(o),
                Err(_) => return false,
            },
            SeekOrigin::Current => SeekFrom::Current(offset),
        };
        match self.inner.seek(pos) {
            Ok(_) => true,
            Err(e) => {
                warn!("定位失败: {e}");
                false
            }
        }
    }
}

/// 文件字节源
#[derive(Debug)]
pub struct FileSource {
    inner: IoSource<File>,
    size: Option<u64>,
}

impl FileSource {
    /// 以只读方式打开文件
    pub fn open(path: impl AsRef<Path>) -> YinResult<Self> {
        let file = File::open(path)?;
        Ok(Self::from_file(file))
    }

    pub fn from_file(file: File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self {
            inner: IoSource::new(file),
            size,
        }
    }

    /// 文件大小 (如果可知)
    pub fn size(&self) -> Option<u64> {
        self.size
    }
}

impl ByteSource for FileSource {
    fn read(&mut self, buf: &mut [u8]) -> usize {
        self.inner.read(buf)
    }

    fn seek(&mut self, offset: i64, origin: SeekOrigin) -> bool {
        self.inner.seek(offset, origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    #[test]
    fn test_memory_source_read_and_seek() {
        let data: Vec<u8> = (0..10).collect();
        let mut src = MemorySource::new(&data);
        let mut buf = [0u8; 4];
        assert_eq!(src.read(&mut buf), 4);
        assert_eq!(buf, [0, 1, 2, 3]);

        assert!(src.seek(2, SeekOrigin::Current));
        assert_eq!(src.read(&mut buf), 4);
        assert_eq!(buf, [6, 7, 8, 9]);
        assert_eq!(src.read(&mut buf), 0);

        assert!(src.seek(0, SeekOrigin::Start));
        assert_eq!(src.position(), 0);
        assert!(!src.seek(-1, SeekOrigin::Start));
        assert!(!src.seek(11, SeekOrigin::Start));
        assert!(src.seek(10, SeekOrigin::Start));
    }

    #[test]
    fn test_owned_memory_source() {
        let mut src = MemorySource::from_vec(vec![1, 2, 3]);
        let mut buf = [0u8; 8];
        assert_eq!(src.read(&mut buf), 3);
        assert_eq!(src.len(), 3);
    }

    #[test]
    fn test_io_source_cursor() {
        let mut src = IoSource::new(Cursor::new(vec![9u8, 8, 7, 6]));
        let mut buf = [0u8; 2];
        assert_eq!(src.read(&mut buf), 2);
        assert!(src.seek(-1, SeekOrigin::Current));
        assert_eq!(src.read(&mut buf), 2);
        assert_eq!(buf, [8, 7]);
        assert!(!src.seek(-1, SeekOrigin::Start));
        assert_eq!(src.into_inner().position(), 3);
    }

    #[test]
    fn test_file_source() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"yin-stream").unwrap();
        let mut src = FileSource::open(file.path()).unwrap();
        assert_eq!(src.size(), Some(10));
        let mut buf = [0u8; 16];
        assert_eq!(src.read(&mut buf), 10);
        assert_eq!(&buf[..10], b"yin-stream");
        assert!(src.seek(4, SeekOrigin::Start));
        assert_eq!(src.read(&mut buf), 6);
        assert_eq!(&buf[..6], b"stream");
    }

    #[test]
    fn test_missing_file() {
        assert!(FileSource::open("/nonexistent/yin.mp3").is_err());
    }

    #[test]
    fn test_forwarding_impls() {
        let data = [1u8, 2, 3];
        let mut src = MemorySource::new(&data);
        let mut boxed: Box<dyn ByteSource + '_> = Box::new(&mut src);
        let mut buf = [0u8; 1];
        assert_eq!(boxed.read(&mut buf), 1);
        drop(boxed);
        assert_eq!(src.position(), 1);
    }
}
