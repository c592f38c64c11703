//! The TrueType `cmap` table: character code to glyph index mapping.
//!
//! A cmap table holds a directory of subtables, one per (platform,
//! encoding) pair. Each subtable is decoded in two phases: first every
//! directory record (platform id, encoding id, subtable offset) is read
//! sequentially, then each subtable body is decoded by seeking to
//! `table offset + subtable offset`.

mod subtable;

pub use subtable::CmapSubtable;

use crate::error::Result;
use crate::stream::TtfDataStream;

/// Unicode platform id.
pub const PLATFORM_UNICODE: u16 = 0;
/// Macintosh platform id.
pub const PLATFORM_MACINTOSH: u16 = 1;
/// ISO platform id (deprecated in the OpenType spec, still seen in fonts).
pub const PLATFORM_ISO: u16 = 2;
/// Windows platform id.
pub const PLATFORM_WINDOWS: u16 = 3;

/// Windows Symbol encoding.
pub const ENCODING_SYMBOL: u16 = 0;
/// Windows Unicode BMP encoding.
pub const ENCODING_UNICODE: u16 = 1;
/// Windows Shift-JIS encoding.
pub const ENCODING_SHIFT_JIS: u16 = 2;
/// Windows Big5 encoding.
pub const ENCODING_BIG5: u16 = 3;
/// Windows PRC encoding.
pub const ENCODING_PRC: u16 = 4;
/// Windows Wansung encoding.
pub const ENCODING_WANSUNG: u16 = 5;
/// Windows Johab encoding.
pub const ENCODING_JOHAB: u16 = 6;

/// A parsed `cmap` table: the subtable directory plus every decoded
/// subtable.
#[derive(Debug, Default)]
pub struct CmapTable {
    version: u16,
    subtables: Vec<CmapSubtable>,
}

impl CmapTable {
    /// Parse the cmap table found at `table_offset` in the stream.
    ///
    /// # Arguments
    /// * `data` - Stream over the font file.
    /// * `table_offset` - Absolute offset of the cmap table (from the font's
    ///   table directory).
    /// * `num_glyphs` - Glyph count from the font's `maxp` table; used to
    ///   size and bound the glyph-indexed mapping.
    pub fn parse<S: TtfDataStream + ?Sized>(
        data: &mut S,
        table_offset: u64,
        num_glyphs: u32,
    ) -> Result<Self> {
        data.seek(table_offset)?;
        let version = data.read_u16()?;
        let number_of_tables = data.read_u16()?;
        log::trace!(
            "cmap table version {} with {} subtables",
            version,
            number_of_tables
        );

        // Phase 1: the directory records are contiguous, so read them all
        // before any subtable body moves the cursor.
        let mut subtables = Vec::with_capacity(usize::from(number_of_tables));
        for _ in 0..number_of_tables {
            let mut subtable = CmapSubtable::new();
            subtable.init_data(data)?;
            subtables.push(subtable);
        }

        // Phase 2: decode each subtable body.
        for subtable in &mut subtables {
            subtable.init_subtable(table_offset, num_glyphs, data)?;
        }

        Ok(Self { version, subtables })
    }

    /// The cmap table version (0 in practice).
    pub fn version(&self) -> u16 {
        self.version
    }

    /// All decoded subtables, in directory order.
    pub fn subtables(&self) -> &[CmapSubtable] {
        &self.subtables
    }

    /// Find the subtable for a (platform, encoding) pair.
    pub fn subtable(&self, platform_id: u16, platform_encoding_id: u16) -> Option<&CmapSubtable> {
        self.subtables.iter().find(|subtable| {
            subtable.platform_id() == platform_id
                && subtable.platform_encoding_id() == platform_encoding_id
        })
    }
}
