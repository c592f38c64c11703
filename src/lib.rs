// Allow some clippy lints that are too pedantic for this project
#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

//! # Font Oxide
//!
//! TrueType/OpenType character-to-glyph mapping in Rust.
//!
//! The crate decodes the `cmap` table of a font: the binary structure
//! that maps Unicode (or legacy) character codes to glyph indices. All
//! nine subtable layouts found in real fonts are dispatched (formats 0,
//! 2, 4, 6, 8, 10, 12, 13, 14), and each decoder treats the input as
//! adversarial: counts, code ranges, surrogate-band intersections, and
//! glyph-index bounds are validated before any write, and every failure
//! surfaces as a typed [`Error`].
//!
//! ## Quick start
//!
//! ```no_run
//! use font_oxide::{CmapTable, MemoryTtfStream};
//!
//! # fn main() -> font_oxide::Result<()> {
//! let font_data: Vec<u8> = std::fs::read("font.ttf")?;
//! // Offsets come from the font's table directory; glyph count from maxp.
//! let (cmap_offset, num_glyphs) = (0x130, 1024);
//!
//! let mut stream = MemoryTtfStream::new(font_data);
//! let cmap = CmapTable::parse(&mut stream, cmap_offset, num_glyphs)?;
//!
//! if let Some(subtable) = cmap.subtable(font_oxide::cmap::PLATFORM_WINDOWS,
//!                                       font_oxide::cmap::ENCODING_UNICODE) {
//!     let glyph = subtable.glyph_id('A' as u32); // 0 means .notdef
//!     println!("glyph id for 'A': {glyph}");
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Scope
//!
//! Decoding only: no outline rendering, hinting, metrics tables, or
//! serialization back to binary. Format 14 (Unicode variation sequences)
//! is deliberately unimplemented and fails with
//! [`Error::UnsupportedFormat`].

pub mod cmap;
pub mod error;
pub mod stream;

pub use cmap::{CmapSubtable, CmapTable};
pub use error::{Error, Result};
pub use stream::{MemoryTtfStream, TtfDataStream};
