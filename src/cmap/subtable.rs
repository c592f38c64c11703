//! Decoder for a single cmap subtable.
//!
//! A subtable stores the character-to-glyph relation in one of nine binary
//! layouts (formats 0, 2, 4, 6, 8, 10, 12, 13, 14). Some layouts encode
//! glyph-to-character, some character-to-glyph, and several allow many
//! character codes per glyph; the decoder normalizes all of them into one
//! bidirectional mapping. All multi-byte fields are big-endian, and the
//! table is attacker-controlled input: counts, ranges, and glyph indices
//! are validated before any write.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::stream::TtfDataStream;

/// Highest valid Unicode scalar value.
const MAX_CODE_POINT: u64 = 0x10FFFF;
/// UTF-16 surrogate band; invalid as standalone character codes.
const SURROGATE_START: u64 = 0xD800;
const SURROGATE_END: u64 = 0xDFFF;
/// Widened-arithmetic guard: decoded values must stay representable.
const MAX_VALUE: u64 = i32::MAX as u64;

/// The closed set of cmap subtable layouts.
///
/// Keeping this as an enum makes the dispatch exhaustive: an unknown tag
/// is rejected at construction and the deliberately unimplemented format
/// 14 is a visible match arm, not a default branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubtableFormat {
    /// Format 0: byte encoding table.
    ByteEncoding,
    /// Format 2: high-byte mapping through sub-headers (CJK legacy).
    HighByteMapping,
    /// Format 4: segment mapping to delta values (Unicode BMP).
    SegmentMapping,
    /// Format 6: trimmed table mapping.
    TrimmedTable,
    /// Format 8: mixed 16-bit and 32-bit coverage.
    Mixed32BitCoverage,
    /// Format 10: trimmed array.
    TrimmedArray,
    /// Format 12: segmented coverage.
    SegmentedCoverage,
    /// Format 13: many-to-one range mappings.
    ManyToOneRange,
    /// Format 14: Unicode variation sequences (not supported).
    VariationSequences,
}

impl SubtableFormat {
    fn from_tag(tag: u16) -> Result<Self> {
        match tag {
            0 => Ok(Self::ByteEncoding),
            2 => Ok(Self::HighByteMapping),
            4 => Ok(Self::SegmentMapping),
            6 => Ok(Self::TrimmedTable),
            8 => Ok(Self::Mixed32BitCoverage),
            10 => Ok(Self::TrimmedArray),
            12 => Ok(Self::SegmentedCoverage),
            13 => Ok(Self::ManyToOneRange),
            14 => Ok(Self::VariationSequences),
            _ => Err(Error::UnsupportedFormat(tag)),
        }
    }
}

/// Format 2 sub-header record, read in bulk so glyph-index resolution
/// does not re-seek the stream per header.
struct SubHeader {
    first_code: u16,
    entry_count: u16,
    /// Added to a nonzero glyph-index candidate, mod 65536.
    id_delta: i16,
    /// Byte offset from the start of the glyph-index sub-array, already
    /// adjusted for the header's position; may be negative.
    id_range_offset: i32,
}

/// Absolute offset of a format 2 glyph-index entry.
///
/// `glyph_index_base` is the stream position directly after the last
/// sub-header; `id_range_offset` carries the position-dependent
/// adjustment applied when the sub-header was read.
fn format2_glyph_offset(glyph_index_base: u64, id_range_offset: i32) -> Option<u64> {
    glyph_index_base.checked_add_signed(i64::from(id_range_offset))
}

/// Absolute offset of a format 4 glyph-index entry.
///
/// `glyph_index_base` is the stream position directly after the four
/// parallel segment arrays. The `segment - seg_count` term walks back
/// from there to the segment's idRangeOffset field, from which the
/// offset is defined in the file format.
fn format4_glyph_offset(
    glyph_index_base: u64,
    segment: usize,
    seg_count: usize,
    start_code: u16,
    code: u16,
    id_range_offset: u16,
) -> Option<u64> {
    let words = i64::from(id_range_offset / 2) + i64::from(code - start_code) + segment as i64
        - seg_count as i64;
    glyph_index_base.checked_add_signed(words * 2)
}

/// Convert a packed UTF-16 surrogate pair value to its scalar code point
/// via the standard lead/trail offsets.
fn surrogate_pair_to_code_point(value: u64) -> u64 {
    const LEAD_OFFSET: i64 = 0xD800 - (0x10000 >> 10);
    const SURROGATE_OFFSET: i64 = 0x10000 - (0xD800 << 10) - 0xDC00;
    let lead = LEAD_OFFSET + (value >> 10) as i64;
    let trail = 0xDC00 + (value & 0x3FF) as i64;
    ((lead << 10) + trail + SURROGATE_OFFSET) as u64
}

fn in_surrogate_band(code: u64) -> bool {
    (SURROGATE_START..=SURROGATE_END).contains(&code)
}

/// One decoded cmap subtable: a bidirectional character/glyph mapping for
/// a single (platform, encoding) pair.
///
/// `glyph_id_to_character_code` is indexed by glyph id; unpopulated slots
/// hold 0, the `.notdef` convention. `character_code_to_glyph_id` is the
/// inverse relation; several character codes may share one glyph. Once
/// decoded the mapping is read-only apart from the explicit setters.
#[derive(Debug, Default)]
pub struct CmapSubtable {
    platform_id: u16,
    platform_encoding_id: u16,
    subtable_offset: u32,
    glyph_id_to_character_code: Vec<u32>,
    character_code_to_glyph_id: HashMap<u32, u32>,
}

impl CmapSubtable {
    /// Create an empty subtable; populate it with [`Self::init_data`] and
    /// [`Self::init_subtable`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Read this subtable's directory record: platform id, encoding id,
    /// and the subtable's byte offset within the cmap table.
    pub fn init_data<S: TtfDataStream + ?Sized>(&mut self, data: &mut S) -> Result<()> {
        self.platform_id = data.read_u16()?;
        self.platform_encoding_id = data.read_u16()?;
        self.subtable_offset = data.read_u32()?;
        Ok(())
    }

    /// Decode the subtable body.
    ///
    /// Seeks to `table_offset + subtable_offset`, reads the format tag and
    /// the tag-dependent length/version header, and dispatches to the
    /// format's decode routine.
    ///
    /// # Arguments
    /// * `table_offset` - Absolute offset of the owning cmap table.
    /// * `num_glyphs` - Declared glyph count of the font.
    /// * `data` - Stream over the font file.
    pub fn init_subtable<S: TtfDataStream + ?Sized>(
        &mut self,
        table_offset: u64,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        data.seek(table_offset + u64::from(self.subtable_offset))?;
        let tag = data.read_u16()?;
        // Reject unknown tags before touching any subtable-specific bytes.
        let format = SubtableFormat::from_tag(tag)?;

        // Formats below 8 use 16-bit length/version fields; from 8 on the
        // tag is padded to a fixed32 and both fields widen to 32 bits.
        let (length, version) = if tag < 8 {
            (u64::from(data.read_u16()?), u64::from(data.read_u16()?))
        } else {
            data.read_u16()?;
            (u64::from(data.read_u32()?), u64::from(data.read_u32()?))
        };
        log::trace!(
            "cmap subtable format {} (platform {}, encoding {}), length {}, version {}",
            tag,
            self.platform_id,
            self.platform_encoding_id,
            length,
            version
        );

        match format {
            SubtableFormat::ByteEncoding => self.parse_byte_encoding(data),
            SubtableFormat::HighByteMapping => self.parse_high_byte_mapping(num_glyphs, data),
            SubtableFormat::SegmentMapping => self.parse_segment_mapping(data),
            SubtableFormat::TrimmedTable => self.parse_trimmed_table(num_glyphs, data),
            SubtableFormat::Mixed32BitCoverage => self.parse_mixed_coverage(num_glyphs, data),
            SubtableFormat::TrimmedArray => self.parse_trimmed_array(data),
            SubtableFormat::SegmentedCoverage => self.parse_segmented_coverage(num_glyphs, data),
            SubtableFormat::ManyToOneRange => self.parse_many_to_one(num_glyphs, data),
            SubtableFormat::VariationSequences => Err(Error::UnsupportedFormat(14)),
        }
    }

    /// Format 0: 256 byte-sized glyph ids, one per character code.
    fn parse_byte_encoding<S: TtfDataStream + ?Sized>(&mut self, data: &mut S) -> Result<()> {
        let glyph_mapping = data.read_bytes(256)?;
        self.glyph_id_to_character_code = vec![0; 256];
        for (code, &glyph_byte) in glyph_mapping.iter().enumerate() {
            let code = code as u32;
            let glyph_id = u32::from(glyph_byte);
            self.glyph_id_to_character_code[glyph_id as usize] = code;
            self.character_code_to_glyph_id.insert(code, glyph_id);
        }
        Ok(())
    }

    /// Format 2: 256 high-byte keys selecting sub-headers, each sub-header
    /// covering a run of two-byte codes resolved through a shared
    /// glyph-index sub-array.
    fn parse_high_byte_mapping<S: TtfDataStream + ?Sized>(
        &mut self,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        // Each key is a byte offset into the sub-header array; key / 8 is
        // the sub-header index. The maximum index bounds the array length.
        let mut max_sub_header_index = 0usize;
        for _ in 0..256 {
            let key = data.read_u16()?;
            max_sub_header_index = max_sub_header_index.max(usize::from(key / 8));
        }

        // Read all sub-headers up front; resolving glyph indices below
        // seeks away from this region, and re-seeking per header would
        // read the same bytes repeatedly.
        let mut sub_headers = Vec::with_capacity(max_sub_header_index + 1);
        for i in 0..=max_sub_header_index {
            let first_code = data.read_u16()?;
            let entry_count = data.read_u16()?;
            let id_delta = data.read_i16()?;
            // The raw value is relative to the idRangeOffset field itself;
            // re-base it onto the start of the glyph-index sub-array.
            let id_range_offset = i32::from(data.read_u16()?)
                - ((max_sub_header_index - i) as i32) * 8
                - 2;
            sub_headers.push(SubHeader {
                first_code,
                entry_count,
                id_delta,
                id_range_offset,
            });
        }

        let glyph_index_base = data.position()?;
        self.glyph_id_to_character_code = vec![0; num_glyphs as usize];

        for (i, sub_header) in sub_headers.iter().enumerate() {
            let offset = format2_glyph_offset(glyph_index_base, sub_header.id_range_offset)
                .ok_or_else(|| {
                    Error::MalformedHeader(format!(
                        "format 2 sub-header {} points before the glyph index array",
                        i
                    ))
                })?;
            data.seek(offset)?;
            for j in 0..sub_header.entry_count {
                let char_code =
                    ((i as u32) << 8) + u32::from(sub_header.first_code) + u32::from(j);
                let candidate = data.read_u16()?;
                let glyph_id = if candidate > 0 {
                    (i32::from(candidate) + i32::from(sub_header.id_delta)).rem_euclid(65536)
                        as u32
                } else {
                    0
                };
                if glyph_id >= num_glyphs {
                    return Err(Error::InvalidGlyphIndex {
                        glyph_id: u64::from(glyph_id),
                        num_glyphs,
                    });
                }
                // Later sub-headers overwrite earlier writes to the same
                // glyph id; headers are processed in ascending order.
                self.glyph_id_to_character_code[glyph_id as usize] = char_code;
                self.character_code_to_glyph_id.insert(char_code, glyph_id);
            }
        }
        Ok(())
    }

    /// Format 4: segments of BMP codes resolved either by a direct delta
    /// or indirectly through the trailing glyph-index array.
    fn parse_segment_mapping<S: TtfDataStream + ?Sized>(&mut self, data: &mut S) -> Result<()> {
        let seg_count_x2 = data.read_u16()?;
        let seg_count = usize::from(seg_count_x2 / 2);
        let _search_range = data.read_u16()?;
        let _entry_selector = data.read_u16()?;
        let _range_shift = data.read_u16()?;
        let end_code = data.read_u16_array(seg_count)?;
        let _reserved_pad = data.read_u16()?;
        let start_code = data.read_u16_array(seg_count)?;
        let id_delta = data.read_u16_array(seg_count)?;
        let id_range_offset = data.read_u16_array(seg_count)?;

        // The indirect branch measures offsets from the first byte after
        // the parallel arrays.
        let glyph_index_base = data.position()?;

        // Glyph ids are collected here first; the final array length is
        // one past the largest glyph id actually seen, which need not
        // match the font's nominal glyph count.
        let mut glyph_to_char: HashMap<u32, u32> = HashMap::new();

        for i in 0..seg_count {
            let start = start_code[i];
            let end = end_code[i];
            let delta = id_delta[i];
            let range_offset = id_range_offset[i];
            if start == 0xFFFF || end == 0xFFFF {
                continue;
            }
            for code in start..=end {
                if range_offset == 0 {
                    let glyph_id = u32::from(code.wrapping_add(delta));
                    glyph_to_char.insert(glyph_id, u32::from(code));
                    self.character_code_to_glyph_id
                        .insert(u32::from(code), glyph_id);
                } else {
                    let offset = format4_glyph_offset(
                        glyph_index_base,
                        i,
                        seg_count,
                        start,
                        code,
                        range_offset,
                    )
                    .ok_or_else(|| {
                        Error::MalformedHeader(format!(
                            "format 4 segment {} points before the glyph index array",
                            i
                        ))
                    })?;
                    data.seek(offset)?;
                    let glyph_index = data.read_u16()?;
                    if glyph_index != 0 {
                        let glyph_id = u32::from(glyph_index.wrapping_add(delta));
                        // First write wins on the indirect branch: a glyph
                        // id already claimed keeps its character code, and
                        // the skipped code gets no inverse entry either.
                        if !glyph_to_char.contains_key(&glyph_id) {
                            glyph_to_char.insert(glyph_id, u32::from(code));
                            self.character_code_to_glyph_id
                                .insert(u32::from(code), glyph_id);
                        }
                    }
                }
            }
        }

        let max_glyph_id = glyph_to_char.keys().max().copied().ok_or_else(|| {
            Error::MalformedHeader("format 4 subtable maps no character codes".to_string())
        })?;
        let mut table = vec![0u32; max_glyph_id as usize + 1];
        for (glyph_id, char_code) in &glyph_to_char {
            table[*glyph_id as usize] = *char_code;
        }
        self.glyph_id_to_character_code = table;
        Ok(())
    }

    /// Format 6: a contiguous run of character codes with one glyph id
    /// each.
    fn parse_trimmed_table<S: TtfDataStream + ?Sized>(
        &mut self,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        let first_code = data.read_u16()?;
        let entry_count = data.read_u16()?;
        self.glyph_id_to_character_code = vec![0; num_glyphs as usize];
        let glyph_id_array = data.read_u16_array(usize::from(entry_count))?;
        for (i, &glyph_id) in glyph_id_array.iter().enumerate() {
            let glyph_id = u32::from(glyph_id);
            if glyph_id >= num_glyphs {
                return Err(Error::InvalidGlyphIndex {
                    glyph_id: u64::from(glyph_id),
                    num_glyphs,
                });
            }
            let char_code = u32::from(first_code) + i as u32;
            self.glyph_id_to_character_code[glyph_id as usize] = char_code;
            self.character_code_to_glyph_id.insert(char_code, glyph_id);
        }
        Ok(())
    }

    /// Format 8: groups of 32-bit codes, with a presence bitmap marking
    /// which 16-bit values are actually packed surrogate pairs.
    fn parse_mixed_coverage<S: TtfDataStream + ?Sized>(
        &mut self,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        // 65536 bits, one per 16-bit code unit.
        let is32 = data.read_u8_array(8192)?;
        let nb_groups = data.read_u32()?;
        if nb_groups > 65536 {
            return Err(Error::MalformedHeader(format!(
                "format 8 subtable declares {} groups (maximum 65536)",
                nb_groups
            )));
        }

        self.glyph_id_to_character_code = vec![0; num_glyphs as usize];
        for _ in 0..nb_groups {
            let first_code = u64::from(data.read_u32()?);
            let end_code = u64::from(data.read_u32()?);
            let start_glyph = u64::from(data.read_u32()?);

            if first_code > end_code {
                return Err(Error::InvalidCodeRange(format!(
                    "format 8 group range {:#x}..{:#x} is inverted",
                    first_code, end_code
                )));
            }

            for code in first_code..=end_code {
                if code > MAX_VALUE {
                    return Err(Error::ArithmeticOverflow("format 8 character code"));
                }
                // Codes beyond the bitmap can only be 32-bit values.
                let is_32bit = match is32.get((code / 8) as usize) {
                    Some(&byte) => byte & (1u8 << (code % 8)) != 0,
                    None => true,
                };
                let char_code = if is_32bit {
                    let code_point = surrogate_pair_to_code_point(code);
                    if code_point > MAX_VALUE {
                        return Err(Error::ArithmeticOverflow(
                            "format 8 supplementary character code",
                        ));
                    }
                    code_point as u32
                } else {
                    code as u32
                };

                let glyph_index = start_glyph + (code - first_code);
                if glyph_index >= u64::from(num_glyphs) || glyph_index > MAX_VALUE {
                    return Err(Error::InvalidGlyphIndex {
                        glyph_id: glyph_index,
                        num_glyphs,
                    });
                }
                self.glyph_id_to_character_code[glyph_index as usize] = char_code;
                self.character_code_to_glyph_id
                    .insert(char_code, glyph_index as u32);
            }
        }
        Ok(())
    }

    /// Format 10: header validation only.
    ///
    /// The glyph array of this layout is not decoded; rather than return
    /// an empty mapping that looks valid, the gap surfaces as an explicit
    /// error once the header checks pass.
    fn parse_trimmed_array<S: TtfDataStream + ?Sized>(&mut self, data: &mut S) -> Result<()> {
        let start_code = u64::from(data.read_u32()?);
        let num_chars = u64::from(data.read_u32()?);
        if num_chars > MAX_VALUE {
            return Err(Error::MalformedHeader(format!(
                "format 10 subtable declares {} characters",
                num_chars
            )));
        }
        let end = start_code + num_chars;
        if start_code > MAX_CODE_POINT || end > MAX_CODE_POINT || in_surrogate_band(end) {
            return Err(Error::InvalidCodeRange(format!(
                "format 10 range {:#x}..{:#x} is out of the Unicode scalar range",
                start_code, end
            )));
        }
        log::debug!("cmap format 10 glyph array decoding is not implemented");
        Err(Error::UnsupportedFormat(10))
    }

    /// Format 12: groups mapping consecutive codes to consecutive glyphs.
    fn parse_segmented_coverage<S: TtfDataStream + ?Sized>(
        &mut self,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        let nb_groups = data.read_u32()?;
        self.glyph_id_to_character_code = vec![0; num_glyphs as usize];
        for _ in 0..nb_groups {
            let first_code = u64::from(data.read_u32()?);
            let end_code = u64::from(data.read_u32()?);
            let start_glyph = u64::from(data.read_u32()?);

            validate_group_codes(12, first_code, end_code)?;
            if end_code < first_code {
                continue;
            }

            for offset in 0..=(end_code - first_code) {
                let char_code = first_code + offset;
                if char_code > MAX_VALUE {
                    return Err(Error::ArithmeticOverflow("format 12 character code"));
                }
                let glyph_index = start_glyph + offset;
                if glyph_index >= u64::from(num_glyphs) || glyph_index > MAX_VALUE {
                    return Err(Error::InvalidGlyphIndex {
                        glyph_id: glyph_index,
                        num_glyphs,
                    });
                }
                self.glyph_id_to_character_code[glyph_index as usize] = char_code as u32;
                self.character_code_to_glyph_id
                    .insert(char_code as u32, glyph_index as u32);
            }
        }
        Ok(())
    }

    /// Format 13: every code in a group maps to the same glyph.
    fn parse_many_to_one<S: TtfDataStream + ?Sized>(
        &mut self,
        num_glyphs: u32,
        data: &mut S,
    ) -> Result<()> {
        let nb_groups = data.read_u32()?;
        self.glyph_id_to_character_code = vec![0; num_glyphs as usize];
        for _ in 0..nb_groups {
            let first_code = u64::from(data.read_u32()?);
            let end_code = u64::from(data.read_u32()?);
            let glyph_id = u64::from(data.read_u32()?);

            if glyph_id >= u64::from(num_glyphs) {
                return Err(Error::InvalidGlyphIndex {
                    glyph_id,
                    num_glyphs,
                });
            }
            validate_group_codes(13, first_code, end_code)?;
            if end_code < first_code {
                continue;
            }

            for offset in 0..=(end_code - first_code) {
                let char_code = first_code + offset;
                if char_code > MAX_VALUE {
                    return Err(Error::ArithmeticOverflow("format 13 character code"));
                }
                self.glyph_id_to_character_code[glyph_id as usize] = char_code as u32;
                self.character_code_to_glyph_id
                    .insert(char_code as u32, glyph_id as u32);
            }
        }
        Ok(())
    }

    /// The platform id from the subtable's directory record.
    pub fn platform_id(&self) -> u16 {
        self.platform_id
    }

    /// Override the platform id.
    pub fn set_platform_id(&mut self, platform_id: u16) {
        self.platform_id = platform_id;
    }

    /// The platform-specific encoding id from the directory record.
    pub fn platform_encoding_id(&self) -> u16 {
        self.platform_encoding_id
    }

    /// Override the platform encoding id.
    pub fn set_platform_encoding_id(&mut self, platform_encoding_id: u16) {
        self.platform_encoding_id = platform_encoding_id;
    }

    /// The subtable's byte offset within its cmap table.
    pub fn subtable_offset(&self) -> u32 {
        self.subtable_offset
    }

    /// Character codes indexed by glyph id; 0 marks `.notdef` slots.
    pub fn glyph_id_to_character_code(&self) -> &[u32] {
        &self.glyph_id_to_character_code
    }

    /// Replace the glyph-indexed character code array.
    pub fn set_glyph_id_to_character_code(&mut self, glyph_id_to_character_code: Vec<u32>) {
        self.glyph_id_to_character_code = glyph_id_to_character_code;
    }

    /// The glyph id for a character code, or 0 (`.notdef`) when the code
    /// is unmapped.
    pub fn glyph_id(&self, character_code: u32) -> u32 {
        self.character_code_to_glyph_id
            .get(&character_code)
            .copied()
            .unwrap_or(0)
    }

    /// The character code recorded for a glyph id, if any.
    pub fn character_code(&self, glyph_id: u32) -> Option<u32> {
        match self.glyph_id_to_character_code.get(glyph_id as usize) {
            Some(0) | None => None,
            Some(&code) => Some(code),
        }
    }
}

/// Shared code-range validation for the 32-bit group formats (12 and 13).
///
/// A zero `end_code` is accepted with any `first_code`; such a group is
/// skipped by the caller rather than iterated with an inverted range.
fn validate_group_codes(format: u16, first_code: u64, end_code: u64) -> Result<()> {
    if first_code > MAX_CODE_POINT || in_surrogate_band(first_code) {
        return Err(Error::InvalidCodeRange(format!(
            "format {} group start {:#x} is out of the Unicode scalar range",
            format, first_code
        )));
    }
    if end_code > 0
        && (end_code < first_code || end_code > MAX_CODE_POINT || in_surrogate_band(end_code))
    {
        return Err(Error::InvalidCodeRange(format!(
            "format {} group end {:#x} is out of the Unicode scalar range",
            format, end_code
        )));
    }
    Ok(())
}
