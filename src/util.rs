//! Byte-level helpers shared by the container readers.

// ============================================================================
// Image Format Detection
// ============================================================================

/// Image format of an embedded resource.
///
/// Detection is done purely from magic bytes; HD containers carry no
/// filenames or MIME types for their image records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    /// JPEG image (JFIF, Exif or bare SOI/EOI stream)
    Jpeg,
    /// PNG image
    Png,
    /// GIF image
    Gif,
    /// JPEG XR / HD Photo
    Wdp,
    /// SGI image
    Rgb,
    /// Portable bitmap (`P1`/`P4`)
    Pbm,
    /// Portable graymap (`P2`/`P5`)
    Pgm,
    /// Portable pixmap (`P3`/`P6`)
    Ppm,
    /// Sun raster
    Rast,
    /// X bitmap
    Xbm,
    /// Windows bitmap
    Bmp,
    /// WebP image
    WebP,
    /// OpenEXR
    Exr,
}

impl ImageFormat {
    /// File extension used when extracting this format.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Png => "png",
            ImageFormat::Gif => "gif",
            ImageFormat::Wdp => "wdp",
            ImageFormat::Rgb => "rgb",
            ImageFormat::Pbm => "pbm",
            ImageFormat::Pgm => "pgm",
            ImageFormat::Ppm => "ppm",
            ImageFormat::Rast => "rast",
            ImageFormat::Xbm => "xbm",
            ImageFormat::Bmp => "bmp",
            ImageFormat::WebP => "webp",
            ImageFormat::Exr => "exr",
        }
    }
}

/// Extension for payloads that no rule recognises.
pub const UNKNOWN_EXTENSION: &str = "dat";

/// Detect the image format of a raw payload.
///
/// TIFF signatures are reported as [`ImageFormat::Wdp`]: JPEG XR shares the
/// `II`/`MM` byte-order mark, and HD containers never hold plain TIFF.
/// Streams without a JFIF/Exif marker still count as JPEG when they open
/// with SOI and close with EOI before any NUL padding.
pub fn detect_image_format(data: &[u8]) -> Option<ImageFormat> {
    detect_magic(data).or_else(|| is_bare_jpeg(data).then_some(ImageFormat::Jpeg))
}

fn detect_magic(data: &[u8]) -> Option<ImageFormat> {
    // JPEG: JFIF or Exif marker in the APP0/APP1 segment, or a quantization table right after SOI
    if data.len() >= 10 && (&data[6..10] == b"JFIF" || &data[6..10] == b"Exif") {
        return Some(ImageFormat::Jpeg);
    }
    if data.starts_with(&[0xFF, 0xD8, 0xFF, 0xDB]) {
        return Some(ImageFormat::Jpeg);
    }
    if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        return Some(ImageFormat::Png);
    }
    if data.starts_with(b"GIF87a") || data.starts_with(b"GIF89a") {
        return Some(ImageFormat::Gif);
    }
    // TIFF byte-order marks; in HD containers this is always JPEG XR
    if data.starts_with(b"MM") || data.starts_with(b"II") {
        return Some(ImageFormat::Wdp);
    }
    if data.starts_with(&[0x01, 0xDA]) {
        return Some(ImageFormat::Rgb);
    }
    if let Some(format) = detect_netpbm(data) {
        return Some(format);
    }
    if data.starts_with(&[0x59, 0xA6, 0x6A, 0x95]) {
        return Some(ImageFormat::Rast);
    }
    if data.starts_with(b"#define ") {
        return Some(ImageFormat::Xbm);
    }
    if data.starts_with(b"BM") {
        return Some(ImageFormat::Bmp);
    }
    // WebP: RIFF....WEBP
    if data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP" {
        return Some(ImageFormat::WebP);
    }
    if data.starts_with(&[0x76, 0x2F, 0x31, 0x01]) {
        return Some(ImageFormat::Exr);
    }
    None
}

/// Netpbm: `P` and a format digit followed by whitespace.
fn detect_netpbm(data: &[u8]) -> Option<ImageFormat> {
    match *data {
        [b'P', digit, b' ' | b'\t' | b'\n' | b'\r', ..] => match digit {
            b'1' | b'4' => Some(ImageFormat::Pbm),
            b'2' | b'5' => Some(ImageFormat::Pgm),
            b'3' | b'6' => Some(ImageFormat::Ppm),
            _ => None,
        },
        _ => None,
    }
}

fn is_bare_jpeg(data: &[u8]) -> bool {
    if !data.starts_with(&[0xFF, 0xD8]) {
        return false;
    }
    let end = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
    end >= 2 && data[end - 2..end] == [0xFF, 0xD9]
}

// ============================================================================
// Tests
// ============================================================================
