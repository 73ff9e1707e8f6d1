//! EXTH-style metadata block of the CONT header.
//!
//! The block is a prologue (optional `EXTH` identifier, block length, entry
//! count) followed by `entry count` records of `tag:u32 size:u32 payload`,
//! where `size` includes the 8-byte prefix. The tag numbers are shared with
//! the MOBI EXTH header; their meaning inside HD containers is partly guessed,
//! so unknown tags are dumped rather than rejected.

use std::fmt;

use super::headers::Codec;

/// How a tag's payload is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// Text in the header's codec
    String,
    /// Big-endian unsigned integer of 1, 2 or 4 bytes
    Value,
    /// Opaque bytes
    Hex,
}

const EXTH_STRINGS: &[(u32, &str)] = &[
    (1, "Drm Server Id (1)"),
    (2, "Drm Commerce Id (2)"),
    (3, "Drm Ebookbase Book Id(3)"),
    (100, "Creator_(100)"),
    (101, "Publisher_(101)"),
    (102, "Imprint_(102)"),
    (103, "Description_(103)"),
    (104, "ISBN_(104)"),
    (105, "Subject_(105)"),
    (106, "Published_(106)"),
    (107, "Review_(107)"),
    (108, "Contributor_(108)"),
    (109, "Rights_(109)"),
    (110, "SubjectCode_(110)"),
    (111, "Type_(111)"),
    (112, "Source_(112)"),
    (113, "ASIN_(113)"),
    (114, "versionNumber_(114)"),
    (117, "Adult_(117)"),
    (118, "Price_(118)"),
    (119, "Currency_(119)"),
    (122, "fixed-layout_(122)"),
    (123, "book-type_(123)"),
    (124, "orientation-lock_(124)"),
    (126, "original-resolution_(126)"),
    (127, "zero-gutter_(127)"),
    (128, "zero-margin_(128)"),
    (129, "K8_Masthead/Cover_Image_(129)"),
    (132, "RegionMagnification_(132)"),
    (200, "DictShortName_(200)"),
    (208, "Watermark_(208)"),
    (501, "cdeType_(501)"),
    (502, "last_update_time_(502)"),
    (503, "Updated_Title_(503)"),
    (504, "ASIN_(504)"),
    (508, "Unknown_Title_Furigana?_(508)"),
    (517, "Unknown_Creator_Furigana?_(517)"),
    (522, "Unknown_Publisher_Furigana?_(522)"),
    (524, "Language_(524)"),
    (525, "primary-writing-mode_(525)"),
    (526, "Unknown_(526)"),
    (527, "page-progression-direction_(527)"),
    (528, "override-kindle_fonts_(528)"),
    (529, "Unknown_(529)"),
    (534, "Input_Source_Type_(534)"),
    (535, "Kindlegen_BuildRev_Number_(535)"),
    // CONT_Header is 0, ends with CONTAINER_BOUNDARY
    (536, "Container_Info_(536)"),
    (538, "Container_Resolution_(538)"),
    (539, "Container_Mimetype_(539)"),
    (542, "Unknown_but_changes_with_filename_only_(542)"),
    // FONT_CONTAINER, BW_CONTAINER, HD_CONTAINER
    (543, "Container_id_(543)"),
    (544, "Unknown_(544)"),
];

const EXTH_VALUES: &[(u32, &str)] = &[
    (115, "sample_(115)"),
    (116, "StartOffset_(116)"),
    (121, "K8(121)_Boundary_Section_(121)"),
    (125, "K8_Count_of_Resources_Fonts_Images_(125)"),
    (131, "K8_Unidentified_Count_(131)"),
    (201, "CoverOffset_(201)"),
    (202, "ThumbOffset_(202)"),
    (203, "Fake_Cover_(203)"),
    (204, "Creator_Software_(204)"),
    (205, "Creator_Major_Version_(205)"),
    (206, "Creator_Minor_Version_(206)"),
    (207, "Creator_Build_Number_(207)"),
    (401, "Clipping_Limit_(401)"),
    (402, "Publisher_Limit_(402)"),
    (404, "Text_to_Speech_Disabled_(404)"),
];

const EXTH_HEX: &[(u32, &str)] = &[
    (209, "Tamper_Proof_Keys_(209_in_hex)"),
    (300, "Font_Signature_(300_in_hex)"),
];

fn lookup(table: &[(u32, &'static str)], tag: u32) -> Option<&'static str> {
    table.iter().find(|(t, _)| *t == tag).map(|(_, label)| *label)
}

/// Label and interpretation of a known tag.
pub fn tag_rule(tag: u32) -> Option<(&'static str, TagKind)> {
    lookup(EXTH_STRINGS, tag)
        .map(|label| (label, TagKind::String))
        .or_else(|| lookup(EXTH_VALUES, tag).map(|label| (label, TagKind::Value)))
        .or_else(|| lookup(EXTH_HEX, tag).map(|label| (label, TagKind::Hex)))
}

/// One decoded metadata entry, ready for printing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedEntry {
    String {
        tag: u32,
        label: &'static str,
        value: String,
    },
    Value {
        tag: u32,
        label: &'static str,
        value: u32,
        /// Payload width in bytes, also the number of hex digits printed
        width: usize,
    },
    Hex {
        tag: u32,
        label: &'static str,
        hex: String,
    },
    /// Tag missing from every table; dumped as hex
    Unknown { tag: u32, hex: String },
    /// Integer tag with a payload that is not 1, 2 or 4 bytes
    Malformed {
        tag: u32,
        label: &'static str,
        declared_size: u32,
    },
    /// Entry declares a size smaller than its own prefix; decoding stops
    BadSize { tag: u32, declared_size: u32 },
    /// Prologue or entry runs past the end of the block; decoding stops
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },
}

impl RenderedEntry {
    pub fn tag(&self) -> Option<u32> {
        match self {
            RenderedEntry::String { tag, .. }
            | RenderedEntry::Value { tag, .. }
            | RenderedEntry::Hex { tag, .. }
            | RenderedEntry::Unknown { tag, .. }
            | RenderedEntry::Malformed { tag, .. }
            | RenderedEntry::BadSize { tag, .. } => Some(*tag),
            RenderedEntry::Truncated { .. } => None,
        }
    }

    /// True for entries that report a problem instead of a key/value pair.
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RenderedEntry::Malformed { .. }
                | RenderedEntry::BadSize { .. }
                | RenderedEntry::Truncated { .. }
        )
    }
}

impl fmt::Display for RenderedEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderedEntry::String { label, value, .. } => {
                writeln!(f, "\n    Key: \"{label}\"\n        Value: \"{value}\"")
            }
            RenderedEntry::Value {
                label,
                value,
                width,
                ..
            } => writeln!(
                f,
                "\n    Key: \"{label}\"\n        Value: 0x{value:0width$x}",
                width = *width
            ),
            RenderedEntry::Hex { label, hex, .. } => {
                writeln!(f, "\n    Key: \"{label}\"\n        Value: 0x{hex}")
            }
            RenderedEntry::Unknown { tag, hex } => {
                writeln!(f, "\nWarning: Unknown metadata with id {tag} found")?;
                writeln!(f, "    Key: \"{tag} (hex)\"\n        Value: 0x{hex}")
            }
            RenderedEntry::Malformed {
                label,
                declared_size,
                ..
            } => writeln!(
                f,
                "\nError: Value for {label} has unexpected size of {declared_size}"
            ),
            RenderedEntry::BadSize { tag, declared_size } => writeln!(
                f,
                "\nError: Metadata entry {tag} declares size {declared_size}, smaller than its header"
            ),
            RenderedEntry::Truncated {
                offset,
                needed,
                available,
            } => writeln!(
                f,
                "\nError: Metadata truncated at offset 0x{offset:x}: need {needed} bytes, have {available}"
            ),
        }
    }
}

/// Lazy, single-pass decoder over a metadata block.
///
/// Malformed entries are yielded as error items and skipped using their
/// declared size. Only framing damage (a size below 8, or data running past
/// the block) ends the iteration early.
#[derive(Debug, Clone)]
pub struct ExthEntries<'a> {
    codec: Codec,
    /// Entry bytes following the prologue
    data: &'a [u8],
    /// Offset of `data` within the whole block, for error reports
    base: usize,
    pos: usize,
    remaining: u32,
    block_length: u32,
    entry_count: u32,
    pending: Option<RenderedEntry>,
}

impl<'a> ExthEntries<'a> {
    pub fn new(codec: Codec, block: &'a [u8]) -> Self {
        let body = block.strip_prefix(b"EXTH").unwrap_or(block);
        let base = block.len() - body.len() + 8;

        let mut entries = Self {
            codec,
            data: &[],
            base,
            pos: 0,
            remaining: 0,
            block_length: 0,
            entry_count: 0,
            pending: None,
        };

        if block.is_empty() {
            return entries;
        }
        if body.len() < 8 {
            entries.pending = Some(RenderedEntry::Truncated {
                offset: 0,
                needed: base,
                available: block.len(),
            });
            return entries;
        }

        entries.block_length = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
        entries.entry_count = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
        entries.remaining = entries.entry_count;
        entries.data = &body[8..];
        log::debug!(
            "metadata block: {} bytes, declared length {}, {} entries",
            block.len(),
            entries.block_length,
            entries.entry_count
        );
        entries
    }

    /// Block length field from the prologue.
    pub fn block_length(&self) -> u32 {
        self.block_length
    }

    /// Entry count field from the prologue.
    pub fn entry_count(&self) -> u32 {
        self.entry_count
    }

    /// Bytes consumed by the entries decoded so far.
    pub fn consumed(&self) -> usize {
        self.pos
    }

    fn stop(&mut self, entry: RenderedEntry) -> RenderedEntry {
        self.remaining = 0;
        entry
    }

    fn render(&self, tag: u32, declared_size: u32, payload: &[u8]) -> RenderedEntry {
        match tag_rule(tag) {
            Some((label, TagKind::String)) => RenderedEntry::String {
                tag,
                label,
                value: self.codec.decode(payload).into_owned(),
            },
            Some((label, TagKind::Value)) => {
                let value = match *payload {
                    [b] => b as u32,
                    [b0, b1] => u16::from_be_bytes([b0, b1]) as u32,
                    [b0, b1, b2, b3] => u32::from_be_bytes([b0, b1, b2, b3]),
                    _ => {
                        return RenderedEntry::Malformed {
                            tag,
                            label,
                            declared_size,
                        };
                    }
                };
                RenderedEntry::Value {
                    tag,
                    label,
                    value,
                    width: payload.len(),
                }
            }
            Some((label, TagKind::Hex)) => RenderedEntry::Hex {
                tag,
                label,
                hex: hex::encode(payload),
            },
            None => {
                log::debug!("unknown metadata tag {tag}");
                RenderedEntry::Unknown {
                    tag,
                    hex: hex::encode(payload),
                }
            }
        }
    }
}

impl Iterator for ExthEntries<'_> {
    type Item = RenderedEntry;

    fn next(&mut self) -> Option<RenderedEntry> {
        if let Some(entry) = self.pending.take() {
            return Some(entry);
        }
        if self.remaining == 0 {
            return None;
        }

        let data = self.data;
        let pos = self.pos;
        let available = data.len() - pos;
        let Some(prefix) = data.get(pos..pos + 8) else {
            return Some(self.stop(RenderedEntry::Truncated {
                offset: self.base + pos,
                needed: 8,
                available,
            }));
        };

        let tag = u32::from_be_bytes([prefix[0], prefix[1], prefix[2], prefix[3]]);
        let declared_size = u32::from_be_bytes([prefix[4], prefix[5], prefix[6], prefix[7]]);
        if declared_size < 8 {
            return Some(self.stop(RenderedEntry::BadSize { tag, declared_size }));
        }

        let end = pos + declared_size as usize;
        let Some(payload) = data.get(pos + 8..end) else {
            return Some(self.stop(RenderedEntry::Truncated {
                offset: self.base + pos,
                needed: declared_size as usize,
                available,
            }));
        };

        log::debug!("metadata entry {tag} ({declared_size} bytes) at 0x{:x}", self.base + pos);
        self.pos = end;
        self.remaining -= 1;
        Some(self.render(tag, declared_size, payload))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let pending = self.pending.is_some() as usize;
        (pending, Some(self.remaining as usize + pending))
    }
}
