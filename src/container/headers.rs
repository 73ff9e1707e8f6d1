use std::borrow::Cow;
use std::io::{self, Write};

use super::exth::ExthEntries;
use crate::error::{Error, Result};

/// Length of the fixed CONT header block in record 0.
pub const CONT_HEADER_LEN: usize = 48;

/// Text codec selected by the header's codepage field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Cp1252,
    Utf8,
}

impl Codec {
    /// Resolve a Windows codepage number. Unknown codepages fall back to CP1252.
    pub fn from_codepage(codepage: u32) -> Self {
        match codepage {
            65001 => Codec::Utf8,
            1252 => Codec::Cp1252,
            n => {
                log::debug!("unknown codepage {n}, assuming windows-1252");
                Codec::Cp1252
            }
        }
    }

    pub fn encoding(self) -> &'static encoding_rs::Encoding {
        match self {
            Codec::Cp1252 => encoding_rs::WINDOWS_1252,
            Codec::Utf8 => encoding_rs::UTF_8,
        }
    }

    /// Decode bytes, replacing malformed sequences instead of failing.
    pub fn decode(self, bytes: &[u8]) -> Cow<'_, str> {
        let (text, malformed) = self.encoding().decode_without_bom_handling(bytes);
        if malformed {
            log::debug!("lossy {} decode of {} bytes", self.encoding().name(), bytes.len());
        }
        text
    }
}

/// Layout of one fixed header field: name, offset, width in bytes.
type FieldLayout = (&'static str, usize, usize);

/// CONT header fields in on-disk order.
pub const CONT_HEADER_FIELDS: [FieldLayout; 13] = [
    ("magic", 0x00, 4),
    ("record_size", 0x04, 4),
    ("type", 0x08, 2),
    ("count", 0x0A, 2),
    ("codepage", 0x0C, 4),
    ("unknown0", 0x10, 4),
    ("unknown1", 0x14, 4),
    ("num_resc_recs", 0x18, 4),
    ("num_wo_placeholders", 0x1C, 4),
    ("offset_to_hrefs", 0x20, 4),
    ("unknown2", 0x24, 4),
    ("title_offset", 0x28, 4),
    ("title_length", 0x2C, 4),
];

/// CONT header (record 0 of an HD container).
#[derive(Debug, Clone)]
pub struct ContainerHeader<'a> {
    pub magic: [u8; 4],
    pub record_size: u32,
    pub container_type: u16,
    pub count: u16,
    pub codepage: u32,
    pub unknown0: u32,
    pub unknown1: u32,
    pub num_resc_recs: u32,
    pub num_wo_placeholders: u32,
    pub offset_to_hrefs: u32,
    pub unknown2: u32,
    pub title_offset: u32,
    pub title_length: u32,
    pub codec: Codec,
    pub title: String,
    /// Metadata block following the fixed fields
    pub exth: &'a [u8],
}

fn read_u32(data: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        data[offset],
        data[offset + 1],
        data[offset + 2],
        data[offset + 3],
    ])
}

fn read_u16(data: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([data[offset], data[offset + 1]])
}

impl<'a> ContainerHeader<'a> {
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        if data.len() < CONT_HEADER_LEN {
            return Err(Error::Truncated {
                what: "CONT header",
                needed: CONT_HEADER_LEN,
                available: data.len(),
            });
        }

        let codepage = read_u32(data, 0x0C);
        let codec = Codec::from_codepage(codepage);

        let title_offset = read_u32(data, 0x28);
        let title_length = read_u32(data, 0x2C);
        let title_start = title_offset as usize;
        let declared_end = title_start.saturating_add(title_length as usize);
        if declared_end > data.len() {
            log::warn!(
                "CONT title {title_start:#x}..{declared_end:#x} runs past record 0 ({:#x} bytes)",
                data.len()
            );
        }
        let title_end = declared_end.min(data.len());
        let title = codec
            .decode(&data[title_start.min(title_end)..title_end])
            .into_owned();

        // The metadata region is whatever follows the fixed block and is not the title
        let mut exth_start = CONT_HEADER_LEN;
        let mut exth_end = data.len();
        if title_length > 0 && title_start == CONT_HEADER_LEN {
            exth_start = title_end;
        } else if title_start > CONT_HEADER_LEN && title_start < data.len() {
            exth_end = title_start;
        }

        Ok(Self {
            magic: [data[0], data[1], data[2], data[3]],
            record_size: read_u32(data, 0x04),
            container_type: read_u16(data, 0x08),
            count: read_u16(data, 0x0A),
            codepage,
            unknown0: read_u32(data, 0x10),
            unknown1: read_u32(data, 0x14),
            num_resc_recs: read_u32(data, 0x18),
            num_wo_placeholders: read_u32(data, 0x1C),
            offset_to_hrefs: read_u32(data, 0x20),
            unknown2: read_u32(data, 0x24),
            title_offset,
            title_length,
            codec,
            title,
            exth: &data[exth_start..exth_end],
        })
    }

    /// Numeric value of a fixed field by name; `magic` has none.
    pub fn field_value(&self, name: &str) -> Option<u32> {
        let value = match name {
            "record_size" => self.record_size,
            "type" => self.container_type as u32,
            "count" => self.count as u32,
            "codepage" => self.codepage,
            "unknown0" => self.unknown0,
            "unknown1" => self.unknown1,
            "num_resc_recs" => self.num_resc_recs,
            "num_wo_placeholders" => self.num_wo_placeholders,
            "offset_to_hrefs" => self.offset_to_hrefs,
            "unknown2" => self.unknown2,
            "title_offset" => self.title_offset,
            "title_length" => self.title_length,
            _ => return None,
        };
        Some(value)
    }

    pub fn is_cont(&self) -> bool {
        &self.magic == b"CONT"
    }

    /// Metadata entries of this header, decoded with its codec.
    pub fn exth_entries(&self) -> ExthEntries<'a> {
        ExthEntries::new(self.codec, self.exth)
    }

    /// Write the field-by-field header dump, the title and the metadata.
    pub fn dump<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (name, offset, width) in CONT_HEADER_FIELDS {
            match self.field_value(name) {
                Some(value) => writeln!(
                    out,
                    "  Field: {name:>20}   Offset: 0x{offset:03x}   Width:  {width}   Value: 0x{value:0width$x}"
                )?,
                None => writeln!(
                    out,
                    "  Field: {name:>20}   Offset: 0x{offset:03x}   Width:  {width}   Value: {}",
                    String::from_utf8_lossy(&self.magic)
                )?,
            }
        }

        writeln!(out, "EXTH Region Length: 0x{:x}", self.exth.len())?;
        writeln!(out, "EXTH MetaData")?;
        writeln!(out, "{}", self.title)?;

        for entry in self.exth_entries() {
            write!(out, "{entry}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Build a CONT record with the title placed right after the fixed block.
    pub(crate) fn build_cont(codepage: u32, title: &[u8], exth: &[u8]) -> Vec<u8> {
        let mut data = vec![0u8; CONT_HEADER_LEN];
        data[0..4].copy_from_slice(b"CONT");
        data[0x04..0x08].copy_from_slice(&((CONT_HEADER_LEN + title.len() + exth.len()) as u32).to_be_bytes());
        data[0x08..0x0A].copy_from_slice(&1u16.to_be_bytes());
        data[0x0A..0x0C].copy_from_slice(&2u16.to_be_bytes());
        data[0x0C..0x10].copy_from_slice(&codepage.to_be_bytes());
        data[0x18..0x1C].copy_from_slice(&7u32.to_be_bytes());
        data[0x28..0x2C].copy_from_slice(&(CONT_HEADER_LEN as u32).to_be_bytes());
        data[0x2C..0x30].copy_from_slice(&(title.len() as u32).to_be_bytes());
        data.extend_from_slice(title);
        data.extend_from_slice(exth);
        data
    }

    #[test]
    fn test_codec_resolution() {
        assert_eq!(Codec::from_codepage(65001), Codec::Utf8);
        assert_eq!(Codec::from_codepage(1252), Codec::Cp1252);
        assert_eq!(Codec::from_codepage(932), Codec::Cp1252);
    }

    #[test]
    fn test_codec_decode_is_lossy() {
        assert_eq!(Codec::Cp1252.decode(b"caf\xe9"), "café");
        assert_eq!(Codec::Utf8.decode("café".as_bytes()), "café");
        assert_eq!(Codec::Utf8.decode(b"ab\xffc"), "ab\u{FFFD}c");
    }

    #[test]
    fn test_parse_fields() {
        let exth = [0, 0, 0, 8, 0, 0, 0, 0];
        let data = build_cont(65001, b"Hello", &exth);
        let header = ContainerHeader::parse(&data).unwrap();

        assert!(header.is_cont());
        assert_eq!(header.record_size, 61);
        assert_eq!(header.container_type, 1);
        assert_eq!(header.count, 2);
        assert_eq!(header.codec, Codec::Utf8);
        assert_eq!(header.num_resc_recs, 7);
        assert_eq!(header.title, "Hello");
        assert_eq!(header.exth, &exth);
        assert_eq!(header.field_value("title_length"), Some(5));
        assert_eq!(header.field_value("magic"), None);
    }

    #[test]
    fn test_title_after_metadata() {
        let exth = [0, 0, 0, 8, 0, 0, 0, 0];
        let mut data = build_cont(1252, b"", &exth);
        // Move the title behind the metadata block
        let title_offset = data.len() as u32;
        data.extend_from_slice(b"Caf\xe9");
        data[0x28..0x2C].copy_from_slice(&title_offset.to_be_bytes());
        data[0x2C..0x30].copy_from_slice(&4u32.to_be_bytes());

        let header = ContainerHeader::parse(&data).unwrap();
        assert_eq!(header.title, "Café");
        assert_eq!(header.exth, &exth);
    }

    #[test]
    fn test_parse_truncated() {
        let data = vec![0u8; 47];
        assert!(matches!(
            ContainerHeader::parse(&data),
            Err(Error::Truncated { what: "CONT header", needed: 48, available: 47 })
        ));
    }

    #[test]
    fn test_title_overrunning_record_is_clamped() {
        let mut data = build_cont(65001, b"Hi", &[0, 0, 0, 8, 0, 0, 0, 0]);
        data[0x2C..0x30].copy_from_slice(&100u32.to_be_bytes());
        let header = ContainerHeader::parse(&data).unwrap();

        // Everything from the title start to the record end is taken as title
        assert!(header.title.starts_with("Hi"));
        assert_eq!(header.title_length, 100);
        assert!(header.exth.is_empty());
    }

    #[test]
    fn test_title_beyond_record_is_empty() {
        let exth = [0, 0, 0, 8, 0, 0, 0, 0];
        let mut data = build_cont(65001, b"", &exth);
        data[0x28..0x2C].copy_from_slice(&0x1000u32.to_be_bytes());
        data[0x2C..0x30].copy_from_slice(&u32::MAX.to_be_bytes());
        let header = ContainerHeader::parse(&data).unwrap();

        assert_eq!(header.title, "");
        assert_eq!(header.exth, &exth);
        assert_eq!(header.exth_entries().count(), 0);
    }

    #[test]
    fn test_dump_format() {
        let data = build_cont(65001, b"Hello", &[0, 0, 0, 8, 0, 0, 0, 0]);
        let header = ContainerHeader::parse(&data).unwrap();
        let mut out = Vec::new();
        header.dump(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();

        assert!(text.contains("  Field:                magic   Offset: 0x000   Width:  4   Value: CONT\n"));
        assert!(text.contains("  Field:             codepage   Offset: 0x00c   Width:  4   Value: 0xfde9\n"));
        assert!(text.contains("  Field:                 type   Offset: 0x008   Width:  2   Value: 0x01\n"));
        assert!(text.contains("EXTH Region Length: 0x8\nEXTH MetaData\nHello\n"));
        assert!(!text.contains("Key:"));
    }
}
