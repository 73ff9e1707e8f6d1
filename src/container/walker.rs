//! Record inventory and HD image extraction.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bstr::ByteSlice;

use super::headers::ContainerHeader;
use super::pdb::{Container, Record};
use crate::error::Result;
use crate::util::{UNKNOWN_EXTENSION, detect_image_format};

/// Prefix of a record holding a `|`-separated list of link targets.
pub const HREF_LIST_MARKER: &[u8; 12] = b"kindle:embed";

/// Length of the record-local header in front of a CRES image payload.
pub const CRES_HEADER_LEN: usize = 12;

/// Default directory name for extracted images.
pub const DEFAULT_IMAGE_DIR: &str = "azw6_images";

/// Record type, decided from the first bytes of the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Cont,
    Cres,
    Font,
    Resc,
    Placeholder,
    Eof,
    HrefList,
    Unknown,
}

impl RecordKind {
    pub fn classify(data: &[u8]) -> Self {
        if data.starts_with(HREF_LIST_MARKER) {
            return RecordKind::HrefList;
        }
        match data.get(..4) {
            Some(b"FONT") => RecordKind::Font,
            Some(b"RESC") => RecordKind::Resc,
            Some(b"CRES") => RecordKind::Cres,
            Some(b"CONT") => RecordKind::Cont,
            Some([0xA0, 0xA0, 0xA0, 0xA0]) => RecordKind::Placeholder,
            Some([0xE9, 0x8E, 0x0D, 0x0A]) => RecordKind::Eof,
            _ => RecordKind::Unknown,
        }
    }
}

/// Inventory description of a record.
pub fn describe(kind: RecordKind, data: &[u8]) -> String {
    match kind {
        RecordKind::Cont => "Cont Header".to_string(),
        RecordKind::Cres => "CRES".to_string(),
        RecordKind::Font => "FONT".to_string(),
        RecordKind::Resc => "RESC".to_string(),
        RecordKind::Placeholder => "Empty_Image/Resource_Placeholder".to_string(),
        RecordKind::Eof => "EOF_RECORD".to_string(),
        RecordKind::HrefList => {
            let mut desc = String::new();
            for href in data.split_str("|").filter(|h| !h.is_empty()) {
                desc.push_str("\n        ");
                desc.push_str(&href.to_str_lossy());
            }
            desc
        }
        RecordKind::Unknown => {
            let tag = &data[..data.len().min(12)];
            format!("{} {}", hex::encode(tag), tag.to_str_lossy())
        }
    }
}

/// Settings for a container walk.
#[derive(Debug, Clone)]
pub struct WalkOptions {
    /// Directory receiving `HDimage#####.<ext>` files
    pub output_dir: PathBuf,
    /// Write CRES payloads to disk; when false only the inventory is printed
    pub extract: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_IMAGE_DIR),
            extract: true,
        }
    }
}

/// Outcome of a completed walk.
#[derive(Debug, Default)]
pub struct WalkSummary {
    pub record_count: usize,
    /// Paths of extracted images, in record order
    pub images: Vec<PathBuf>,
    /// Records whose image format could not be identified
    pub unrecognized: Vec<usize>,
}

/// Dump the header and record map of `container` to `out`, extracting
/// CRES images along the way.
///
/// Output already written stays written when a later record fails, and
/// images extracted before the failure remain on disk.
pub fn walk<W: Write>(
    container: &Container<'_>,
    options: &WalkOptions,
    out: &mut W,
) -> Result<WalkSummary> {
    log::debug!(
        "walking {:?}: {} records",
        container.name(),
        container.record_count()
    );
    let record0 = container.read_record(0)?;
    writeln!(out, "\n\nFirst Header Dump from Section 0")?;
    let header = ContainerHeader::parse(record0)?;
    if !header.is_cont() {
        writeln!(out, "Warning: Section 0 is not a CONT header")?;
    }
    header.dump(out)?;

    writeln!(out, "\nMap of Palm DB Sections")?;
    writeln!(out, "    Dec  - Hex : Description")?;
    writeln!(out, "    ---- - ----  -----------")?;

    let mut summary = WalkSummary {
        record_count: container.record_count() as usize,
        ..Default::default()
    };

    for record in container.records() {
        let record = record?;
        let kind = RecordKind::classify(record.data);
        log::debug!(
            "record {} at {}..{}: {kind:?}",
            record.index,
            record.start,
            record.end
        );

        match kind {
            RecordKind::Cont => continue,
            RecordKind::Cres if options.extract => {
                extract_cres(&record, &options.output_dir, out, &mut summary)?;
            }
            _ => {}
        }

        writeln!(
            out,
            "    {:04} - {:04x}: {} [{}]",
            record.index,
            record.index,
            describe(kind, record.data),
            record.data.len()
        )?;
    }

    Ok(summary)
}

fn extract_cres<W: Write>(
    record: &Record<'_>,
    output_dir: &Path,
    out: &mut W,
    summary: &mut WalkSummary,
) -> Result<()> {
    let index = record.index;
    let payload = record.data.get(CRES_HEADER_LEN..).unwrap_or_default();

    let ext = match detect_image_format(payload) {
        Some(format) => format.extension(),
        None => {
            writeln!(
                out,
                "        Warning: CRES Section {index} does not contain a recognised resource"
            )?;
            summary.unrecognized.push(index);
            UNKNOWN_EXTENSION
        }
    };

    let name = format!("HDimage{index:05}.{ext}");
    fs::create_dir_all(output_dir)?;
    writeln!(out, "        Extracting HD image: {name} from section {index}")?;

    let path = output_dir.join(&name);
    fs::write(&path, payload)?;
    log::debug!("wrote {} bytes to {}", payload.len(), path.display());
    summary.images.push(path);
    Ok(())
}
