//! # hdcont
//!
//! Reader for Kindle HD containers: the `.azw6` / `.res` files that ship
//! high-resolution images alongside an AZW3 book.
//!
//! ## Features
//!
//! - Validate the `RBINCONT` Palm database and walk its record table
//! - Decode the CONT header and its EXTH-style metadata into a text report
//! - Identify image payloads by magic bytes, including JPEG XR (`wdp`)
//! - Extract `CRES` images as `HDimage#####.<ext>`
//!
//! ## Quick Start
//!
//! ```no_run
//! use hdcont::{Container, WalkOptions, walk};
//!
//! let data = std::fs::read("book.azw6").unwrap();
//! let container = Container::open(&data).unwrap();
//! let summary = walk(&container, &WalkOptions::default(), &mut std::io::stdout()).unwrap();
//! println!("extracted {} images", summary.images.len());
//! ```
//!
//! ## Reading metadata only
//!
//! ```
//! use hdcont::{Codec, ExthEntries};
//!
//! // Prologue: block length 8, zero entries
//! let block = [0, 0, 0, 8, 0, 0, 0, 0];
//! assert_eq!(ExthEntries::new(Codec::Utf8, &block).count(), 0);
//! ```

pub mod container;
pub mod error;
pub mod util;

pub use container::{
    Codec, Container, ContainerHeader, ExthEntries, RecordKind, RenderedEntry, WalkOptions,
    WalkSummary, walk,
};
pub use error::{Error, Result};
pub use util::{ImageFormat, detect_image_format};
