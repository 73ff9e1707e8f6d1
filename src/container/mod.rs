//! Kindle HD container (AZW6 / `.res`) reading.
//!
//! An HD container is a Palm database tagged `RBINCONT`. Record 0 holds the
//! CONT header with its EXTH-style metadata; the remaining records hold
//! high-resolution images (`CRES`), their placeholders, fonts, `RESC`
//! resources and the link list that maps them into the main book.

mod exth;
mod headers;
mod pdb;
mod walker;

pub use exth::{ExthEntries, RenderedEntry, TagKind, tag_rule};
pub use headers::{CONT_HEADER_FIELDS, CONT_HEADER_LEN, Codec, ContainerHeader};
pub use pdb::{Container, HD_CONTAINER_IDENT, PDB_HEADER_LEN, Record};
pub use walker::{
    CRES_HEADER_LEN, DEFAULT_IMAGE_DIR, HREF_LIST_MARKER, RecordKind, WalkOptions, WalkSummary,
    describe, walk,
};
