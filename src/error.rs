//! Error types for the font library.
//!
//! Every validation failure aborts the current subtable decode; nothing is
//! retried or silently skipped. The caller decides whether one unreadable
//! subtable invalidates the whole font.

/// Result type alias for font parsing operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while parsing font data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Subtable format tag is unknown, or known but deliberately
    /// unimplemented (format 14, and the format 10 glyph array).
    #[error("Unsupported cmap subtable format: {0}")]
    UnsupportedFormat(u16),

    /// A count or length field exceeds its defined cap or representable range.
    #[error("Malformed cmap subtable header: {0}")]
    MalformedHeader(String),

    /// Character code or code range outside [0, 0x10FFFF], inverted, or
    /// intersecting the UTF-16 surrogate band.
    #[error("Invalid character code range: {0}")]
    InvalidCodeRange(String),

    /// Resolved glyph index exceeds the font's declared glyph count.
    #[error("Invalid glyph index {glyph_id} (font has {num_glyphs} glyphs)")]
    InvalidGlyphIndex {
        /// The out-of-range glyph index.
        glyph_id: u64,
        /// The declared glyph count of the font.
        num_glyphs: u32,
    },

    /// An intermediate value exceeded the maximum representable signed
    /// 32-bit value.
    #[error("Arithmetic overflow while decoding {0}")]
    ArithmeticOverflow(&'static str),

    /// End of font data reached unexpectedly.
    #[error("End of font data reached unexpectedly")]
    UnexpectedEof,

    /// IO error from the underlying data stream.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_format_error() {
        let err = Error::UnsupportedFormat(99);
        let msg = format!("{}", err);
        assert!(msg.contains("Unsupported cmap subtable format"));
        assert!(msg.contains("99"));
    }

    #[test]
    fn test_invalid_glyph_index_error() {
        let err = Error::InvalidGlyphIndex {
            glyph_id: 1234,
            num_glyphs: 100,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("1234"));
        assert!(msg.contains("100"));
    }

    #[test]
    fn test_malformed_header_error() {
        let err = Error::MalformedHeader("65537 groups".to_string());
        let msg = format!("{}", err);
        assert!(msg.contains("Malformed cmap subtable header"));
        assert!(msg.contains("65537"));
    }
}
