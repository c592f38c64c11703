//! Big-endian byte stream reader for TrueType font data.
//!
//! All integers in a TrueType file are stored big-endian. Decoding a cmap
//! subtable performs non-monotonic seeks (formats 2 and 4 jump backward
//! and forward into the same byte range to resolve glyph-index sub-arrays),
//! so the reader is a mutable cursor rather than a forward-only slice
//! walker. Decode routines borrow the stream exclusively for the duration
//! of one call and never retain it.

use std::io::{Cursor, Read, Seek, SeekFrom};

use byteorder::{BigEndian, ReadBytesExt};

use crate::error::{Error, Result};

/// A seekable big-endian reader over TrueType font data.
///
/// This is the interface the subtable decoder consumes. Implementations
/// must support absolute seeks and report the current position, since the
/// cmap format 2 and 4 algorithms compute absolute offsets into the glyph
/// index sub-arrays.
pub trait TtfDataStream {
    /// Read one unsigned byte.
    fn read_u8(&mut self) -> Result<u8>;

    /// Read a big-endian unsigned 16-bit integer.
    fn read_u16(&mut self) -> Result<u16>;

    /// Read a big-endian signed 16-bit integer.
    fn read_i16(&mut self) -> Result<i16>;

    /// Read a big-endian unsigned 32-bit integer.
    fn read_u32(&mut self) -> Result<u32>;

    /// Read exactly `len` raw bytes.
    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>>;

    /// Seek to an absolute byte offset from the start of the data.
    fn seek(&mut self, offset: u64) -> Result<()>;

    /// Current absolute byte offset from the start of the data.
    fn position(&mut self) -> Result<u64>;

    /// Read `len` big-endian unsigned 16-bit integers.
    fn read_u16_array(&mut self, len: usize) -> Result<Vec<u16>> {
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            values.push(self.read_u16()?);
        }
        Ok(values)
    }

    /// Read `len` unsigned bytes.
    fn read_u8_array(&mut self, len: usize) -> Result<Vec<u8>> {
        self.read_bytes(len)
    }
}

/// An in-memory [`TtfDataStream`] over a byte buffer.
pub struct MemoryTtfStream {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryTtfStream {
    /// Create a stream over the given font data.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            cursor: Cursor::new(data),
        }
    }

    /// Total length of the underlying data in bytes.
    pub fn len(&self) -> usize {
        self.cursor.get_ref().len()
    }

    /// Whether the underlying data is empty.
    pub fn is_empty(&self) -> bool {
        self.cursor.get_ref().is_empty()
    }
}

/// Map short reads to [`Error::UnexpectedEof`]; everything else stays an
/// IO error.
fn map_read_error(err: std::io::Error) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof
    } else {
        Error::Io(err)
    }
}

impl TtfDataStream for MemoryTtfStream {
    fn read_u8(&mut self) -> Result<u8> {
        self.cursor.read_u8().map_err(map_read_error)
    }

    fn read_u16(&mut self) -> Result<u16> {
        self.cursor.read_u16::<BigEndian>().map_err(map_read_error)
    }

    fn read_i16(&mut self) -> Result<i16> {
        self.cursor.read_i16::<BigEndian>().map_err(map_read_error)
    }

    fn read_u32(&mut self) -> Result<u32> {
        self.cursor.read_u32::<BigEndian>().map_err(map_read_error)
    }

    fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.cursor.read_exact(&mut buf).map_err(map_read_error)?;
        Ok(buf)
    }

    fn seek(&mut self, offset: u64) -> Result<()> {
        self.cursor
            .seek(SeekFrom::Start(offset))
            .map_err(Error::Io)?;
        Ok(())
    }

    fn position(&mut self) -> Result<u64> {
        Ok(self.cursor.position())
    }
}
