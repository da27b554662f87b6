//! Byte-stream contract for serialized models.
//!
//! Every fixed-width field and every vector element block is padded to the
//! next multiple of 8 bytes, little-endian. Readers skip the computed
//! padding; writers emit it. Three consumers exist: `ModelWriter` writes to
//! any `Write`, `ModelReader` reads into owned memory from any `Read`, and
//! `ModelMapper` hands out non-owning views into a shared byte region
//! (a read-only memory map or an owned buffer).

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use memmap2::Mmap;

/// Bytes needed after `size` to reach the next multiple of 8.
pub(crate) fn padding_to_8(size: u64) -> u64 {
    (8 - size % 8) % 8
}

/// A shared, immutable byte region backing mapped vectors and bit-vectors.
/// The region outlives every view into it by construction.
#[derive(Clone)]
pub enum ByteRegion {
    /// A read-only memory mapping held for the lifetime of the model.
    Mapped(Arc<Mmap>),
    /// An owned in-memory buffer.
    Owned(Arc<[u8]>),
}

impl ByteRegion {
    pub fn as_slice(&self) -> &[u8] {
        match self {
            ByteRegion::Mapped(mmap) => &mmap[..],
            ByteRegion::Owned(bytes) => bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }
}

/// Sequential writer with 8-byte padding after each field.
pub struct ModelWriter<W: Write> {
    inner: W,
    pos: u64,
}

impl<W: Write> ModelWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner, pos: 0 }
    }

    fn pad(&mut self) -> Result<()> {
        let padding = padding_to_8(self.pos);
        if padding > 0 {
            self.inner.write_all(&[0u8; 8][..padding as usize])?;
            self.pos += padding;
        }
        Ok(())
    }

    pub fn write_u8(&mut self, v: u8) -> Result<()> {
        self.inner.write_u8(v)?;
        self.pos += 1;
        self.pad()
    }

    pub fn write_u32(&mut self, v: u32) -> Result<()> {
        self.inner.write_u32::<LittleEndian>(v)?;
        self.pos += 4;
        self.pad()
    }

    pub fn write_f32(&mut self, v: f32) -> Result<()> {
        self.inner.write_f32::<LittleEndian>(v)?;
        self.pos += 4;
        self.pad()
    }

    pub fn write_u64(&mut self, v: u64) -> Result<()> {
        self.inner.write_u64::<LittleEndian>(v)?;
        self.pos += 8;
        Ok(())
    }

    /// Writes a raw element block followed by its padding.
    pub fn write_raw_padded(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes)?;
        self.pos += bytes.len() as u64;
        self.pad()
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush()?;
        Ok(())
    }
}

/// Sequential reader that skips the 8-byte padding after each field.
pub struct ModelReader<R: Read> {
    inner: R,
    pos: u64,
}

impl<R: Read> ModelReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner, pos: 0 }
    }

    fn skip_padding(&mut self) -> Result<()> {
        let padding = padding_to_8(self.pos);
        if padding > 0 {
            let mut buf = [0u8; 8];
            self.inner
                .read_exact(&mut buf[..padding as usize])
                .context("truncated stream while skipping padding")?;
            self.pos += padding;
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let v = self.inner.read_u8().context("truncated stream")?;
        self.pos += 1;
        self.skip_padding()?;
        Ok(v)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = self
            .inner
            .read_u32::<LittleEndian>()
            .context("truncated stream")?;
        self.pos += 4;
        self.skip_padding()?;
        Ok(v)
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let v = self
            .inner
            .read_f32::<LittleEndian>()
            .context("truncated stream")?;
        self.pos += 4;
        self.skip_padding()?;
        Ok(v)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let v = self
            .inner
            .read_u64::<LittleEndian>()
            .context("truncated stream")?;
        self.pos += 8;
        Ok(v)
    }

    /// Reads a raw element block of `len` bytes and skips its padding.
    pub fn read_raw_padded(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        self.inner
            .read_exact(&mut bytes)
            .context("truncated stream")?;
        self.pos += len as u64;
        self.skip_padding()?;
        Ok(bytes)
    }
}

/// Sequential cursor over a shared byte region. Scalars are decoded; element
/// blocks are handed out as `(region, offset)` views without copying.
pub struct ModelMapper {
    region: ByteRegion,
    pos: usize,
    end: usize,
}

impl ModelMapper {
    /// Memory-maps a whole file read-only.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("cannot map {}", path.display()))?;
        info!("Mapped {} ({} bytes)", path.display(), mmap.len());
        let end = mmap.len();
        Ok(Self {
            region: ByteRegion::Mapped(Arc::new(mmap)),
            pos: 0,
            end,
        })
    }

    /// Memory-maps a byte range embedded inside a larger file, e.g. a model
    /// packed into an asset bundle.
    pub fn from_path_region(path: impl AsRef<Path>, offset: usize, len: usize) -> Result<Self> {
        let path = path.as_ref();
        if len < 8 {
            bail!("cannot map {}: region too small to contain a header", path.display());
        }
        let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
        let mmap = unsafe { Mmap::map(&file) }
            .with_context(|| format!("cannot map {}", path.display()))?;
        let Some(end) = offset.checked_add(len) else {
            bail!("cannot map {}: region offset overflow", path.display());
        };
        if end > mmap.len() {
            bail!(
                "cannot map {}: region [{}, {}) exceeds file size {}",
                path.display(),
                offset,
                end,
                mmap.len()
            );
        }
        Ok(Self {
            region: ByteRegion::Mapped(Arc::new(mmap)),
            pos: offset,
            end,
        })
    }

    /// Treats an owned buffer as the mapped region.
    pub fn from_bytes(bytes: Arc<[u8]>) -> Self {
        let end = bytes.len();
        Self {
            region: ByteRegion::Owned(bytes),
            pos: 0,
            end,
        }
    }

    fn take(&mut self, len: usize) -> Result<usize> {
        let offset = self.pos;
        let Some(next) = offset.checked_add(len) else {
            bail!("truncated region: length overflow");
        };
        if next > self.end {
            bail!("truncated region: need {} bytes at offset {}", len, offset);
        }
        self.pos = next;
        Ok(offset)
    }

    fn skip_padding(&mut self) -> Result<()> {
        let padding = padding_to_8(self.pos as u64) as usize;
        if padding > 0 {
            self.take(padding)?;
        }
        Ok(())
    }

    pub fn map_u8(&mut self) -> Result<u8> {
        let offset = self.take(1)?;
        let v = self.region.as_slice()[offset];
        self.skip_padding()?;
        Ok(v)
    }

    pub fn map_u32(&mut self) -> Result<u32> {
        let offset = self.take(4)?;
        let bytes = &self.region.as_slice()[offset..offset + 4];
        let v = u32::from_le_bytes(bytes.try_into().unwrap());
        self.skip_padding()?;
        Ok(v)
    }

    pub fn map_f32(&mut self) -> Result<f32> {
        Ok(f32::from_bits(self.map_u32()?))
    }

    pub fn map_u64(&mut self) -> Result<u64> {
        let offset = self.take(8)?;
        let bytes = &self.region.as_slice()[offset..offset + 8];
        Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
    }

    /// Hands out a view over an element block of `len` bytes, skipping its
    /// padding. Returns the region handle and the block's offset within it.
    pub fn map_raw_padded(&mut self, len: usize) -> Result<(ByteRegion, usize)> {
        let offset = self.take(len)?;
        self.skip_padding()?;
        Ok((self.region.clone(), offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalars_are_padded_to_eight_bytes() -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut w = ModelWriter::new(&mut buf);
            w.write_u32(0xdead_beef)?;
            w.write_u8(7)?;
            w.write_f32(1.5)?;
            w.write_u64(42)?;
        }
        assert_eq!(buf.len(), 32);

        let mut r = ModelReader::new(&buf[..]);
        assert_eq!(r.read_u32()?, 0xdead_beef);
        assert_eq!(r.read_u8()?, 7);
        assert_eq!(r.read_f32()?, 1.5);
        assert_eq!(r.read_u64()?, 42);

        let mut m = ModelMapper::from_bytes(Arc::from(buf.into_boxed_slice()));
        assert_eq!(m.map_u32()?, 0xdead_beef);
        assert_eq!(m.map_u8()?, 7);
        assert_eq!(m.map_f32()?, 1.5);
        assert_eq!(m.map_u64()?, 42);
        Ok(())
    }

    #[test]
    fn raw_blocks_are_padded() -> Result<()> {
        let mut buf = Vec::new();
        {
            let mut w = ModelWriter::new(&mut buf);
            w.write_raw_padded(&[1, 2, 3])?;
            w.write_u8(9)?;
        }
        assert_eq!(buf.len(), 16);

        let mut r = ModelReader::new(&buf[..]);
        assert_eq!(r.read_raw_padded(3)?, vec![1, 2, 3]);
        assert_eq!(r.read_u8()?, 9);
        Ok(())
    }

    #[test]
    fn truncated_reads_fail() {
        let buf = [1u8, 2, 3];
        let mut r = ModelReader::new(&buf[..]);
        assert!(r.read_u64().is_err());

        let mut m = ModelMapper::from_bytes(Arc::from(vec![1u8, 2, 3].into_boxed_slice()));
        assert!(m.map_u64().is_err());
    }
}
