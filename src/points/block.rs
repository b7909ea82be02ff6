//! Leaf block storage.
//!
//! Every leaf of a tree is one contiguous block:
//!
//! ```text
//! u32       point count
//! u32 * n   doc ids
//! [u8] * n  packed values, packed_bytes_length each
//! ```
//!
//! Integers are big-endian. Blocks are read through a [`BlockSource`], either
//! an in-memory [`Bytes`] buffer or a [`FileBlockSource`].

use crate::error::{Result, SpatioError};
use crate::points::DocId;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use parking_lot::Mutex;
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Arc;

/// Random-access reader for leaf blocks.
pub trait BlockSource: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    fn read_block(&self, offset: u64, len: usize) -> io::Result<Bytes>;

    /// Total number of bytes available.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlockSource for Bytes {
    fn read_block(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let start = usize::try_from(offset)
            .map_err(|_| io::Error::new(io::ErrorKind::UnexpectedEof, "block offset overflow"))?;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= Bytes::len(self))
            .ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::UnexpectedEof,
                    format!(
                        "block [{}, +{}) past end of buffer ({} bytes)",
                        start,
                        len,
                        Bytes::len(self)
                    ),
                )
            })?;
        Ok(self.slice(start..end))
    }

    fn len(&self) -> u64 {
        Bytes::len(self) as u64
    }
}

impl<T: BlockSource + ?Sized> BlockSource for Arc<T> {
    fn read_block(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        (**self).read_block(offset, len)
    }

    fn len(&self) -> u64 {
        (**self).len()
    }
}

/// Leaf blocks read from a file.
///
/// Reads seek a shared handle under a mutex, so concurrent traversals
/// serialize on I/O but nothing else.
#[derive(Debug)]
pub struct FileBlockSource {
    file: Mutex<File>,
    len: u64,
}

impl FileBlockSource {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file)?)
    }

    pub fn new(file: File) -> io::Result<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            len,
        })
    }
}

impl BlockSource for FileBlockSource {
    fn read_block(&self, offset: u64, len: usize) -> io::Result<Bytes> {
        let mut buf = vec![0u8; len];
        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// Decoded contents of one leaf.
#[derive(Debug, Clone)]
pub struct LeafBlock {
    docs: Vec<DocId>,
    values: Bytes,
    packed_bytes_length: usize,
}

impl LeafBlock {
    /// Appends the encoded block for the given points to `buf`.
    pub(crate) fn encode(
        buf: &mut BytesMut,
        docs: impl ExactSizeIterator<Item = DocId>,
        values: impl Iterator<Item = impl AsRef<[u8]>>,
    ) {
        buf.put_u32(docs.len() as u32);
        for doc in docs {
            buf.put_u32(doc);
        }
        for value in values {
            buf.put_slice(value.as_ref());
        }
    }

    pub(crate) fn decode(mut block: Bytes, packed_bytes_length: usize) -> Result<Self> {
        if block.remaining() < 4 {
            return Err(SpatioError::CorruptIndex(format!(
                "leaf block of {} bytes has no header",
                block.remaining()
            )));
        }
        let count = block.get_u32() as usize;
        let expected = count
            .checked_mul(4 + packed_bytes_length)
            .ok_or_else(|| SpatioError::CorruptIndex(format!("bogus leaf count {}", count)))?;
        if block.remaining() != expected {
            return Err(SpatioError::CorruptIndex(format!(
                "leaf block with {} points should hold {} bytes, found {}",
                count,
                expected,
                block.remaining()
            )));
        }

        let mut docs = Vec::with_capacity(count);
        for _ in 0..count {
            docs.push(block.get_u32());
        }
        Ok(Self {
            docs,
            values: block,
            packed_bytes_length,
        })
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn docs(&self) -> &[DocId] {
        &self.docs
    }

    pub fn packed_value(&self, index: usize) -> &[u8] {
        let start = index * self.packed_bytes_length;
        &self.values[start..start + self.packed_bytes_length]
    }

    /// Points in stored order: ascending packed value, ties by doc.
    pub fn iter(&self) -> impl Iterator<Item = (DocId, &[u8])> + '_ {
        self.docs
            .iter()
            .enumerate()
            .map(|(i, &doc)| (doc, self.packed_value(i)))
    }
}
