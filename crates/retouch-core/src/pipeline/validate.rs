//! Security gate run before any pixel work.
//!
//! The gate identifies the true encoding from the leading bytes, checks it
//! against the allow-list, reads dimensions from the header alone and
//! enforces the pixel cap. Only then is the full raster decoded.

use std::io::Cursor;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{Image, SourceFormat};

use super::decode;

/// Header-level facts about a source, gathered without decoding pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceHeader {
    pub format: SourceFormat,
    pub width: u32,
    pub height: u32,
}

/// Validates raw uploads against format and dimension policy.
#[derive(Debug, Clone)]
pub struct ValidationGate {
    limits: LimitsConfig,
}

impl ValidationGate {
    /// Create a new gate with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    pub fn limits(&self) -> &LimitsConfig {
        &self.limits
    }

    /// Run the header checks only.
    ///
    /// Checks, in order:
    /// - The content sniffs as an allow-listed encoding
    /// - Width and height can be read from the header
    /// - Neither dimension exceeds `max_image_dimension`
    pub fn inspect(&self, bytes: &[u8]) -> PipelineResult<SourceHeader> {
        let format = sniff_format(bytes);
        if !self.limits.allows(format.name()) {
            return Err(PipelineError::Format {
                format: format.to_string(),
            });
        }

        let (width, height) = header_dimensions(bytes, format)?;
        let max_dim = self.limits.max_image_dimension;
        if width == 0 || height == 0 {
            return Err(PipelineError::Validation(format!(
                "Image has empty dimensions {width}x{height}"
            )));
        }
        if width > max_dim || height > max_dim {
            return Err(PipelineError::Dimension {
                width: width.into(),
                height: height.into(),
                max_dim,
            });
        }

        Ok(SourceHeader {
            format,
            width,
            height,
        })
    }

    /// Run the header checks, then decode the full raster.
    pub fn validate(&self, bytes: &[u8]) -> PipelineResult<Image> {
        let header = self.inspect(bytes)?;
        let image = decode::decode(bytes, header.format)?;

        // A lying header must not smuggle a larger raster past the cap
        let (width, height) = image.dimensions();
        let max_dim = self.limits.max_image_dimension;
        if width > max_dim || height > max_dim {
            return Err(PipelineError::Dimension {
                width: width.into(),
                height: height.into(),
                max_dim,
            });
        }
        Ok(image)
    }
}

/// Identify the encoding from magic bytes.
pub fn sniff_format(bytes: &[u8]) -> SourceFormat {
    if bytes.len() < 4 {
        return SourceFormat::Unknown;
    }

    // JPEG: FF D8 FF, or MPO when it carries a multi-picture index
    if bytes[0] == 0xFF && bytes[1] == 0xD8 && bytes[2] == 0xFF {
        return if has_mpf_segment(bytes) {
            SourceFormat::Mpo
        } else {
            SourceFormat::Jpeg
        };
    }

    // PNG: 89 50 4E 47
    if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
        return SourceFormat::Png;
    }

    // GIF: GIF8
    if bytes.starts_with(b"GIF8") {
        return SourceFormat::Gif;
    }

    // WebP: RIFF....WEBP
    if bytes.starts_with(b"RIFF") {
        if bytes.len() >= 12 && &bytes[8..12] == b"WEBP" {
            return SourceFormat::Webp;
        }
        return SourceFormat::Unknown;
    }

    // BMP: BM
    if bytes.starts_with(b"BM") {
        return SourceFormat::Bmp;
    }

    // TIFF: II (little-endian) or MM (big-endian) followed by version 42
    if bytes.starts_with(&[b'I', b'I', 0x2A, 0x00]) || bytes.starts_with(&[b'M', b'M', 0x00, 0x2A])
    {
        return SourceFormat::Tiff;
    }

    // ICO: reserved 0, type 1
    if bytes.starts_with(&[0x00, 0x00, 0x01, 0x00]) {
        return SourceFormat::Ico;
    }

    // HEIC/HEIF/AVIF: ftyp box at offset 4
    if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
        return heif_brand(bytes);
    }

    SourceFormat::Unknown
}

/// Classify an ISO-BMFF file by its major and compatible brands.
fn heif_brand(bytes: &[u8]) -> SourceFormat {
    let box_size = read_u32(bytes, 0).unwrap_or(0) as usize;
    let end = box_size.clamp(16, bytes.len().max(16)).min(bytes.len());

    // Major brand at 8..12, minor version at 12..16, compatible brands after
    let mut brands: Vec<&[u8]> = vec![&bytes[8..12]];
    let mut offset = 16;
    while offset + 4 <= end {
        brands.push(&bytes[offset..offset + 4]);
        offset += 4;
    }

    for brand in brands {
        match brand {
            b"avif" | b"avis" => return SourceFormat::Avif,
            b"heic" | b"heix" | b"heim" | b"heis" | b"hevc" | b"hevx" => {
                return SourceFormat::Heic
            }
            b"mif1" | b"msf1" | b"heif" => return SourceFormat::Heif,
            _ => {}
        }
    }
    SourceFormat::Unknown
}

/// Walk the JPEG marker segments up to the scan looking for an APP2
/// segment that starts with the `MPF\0` identifier.
fn has_mpf_segment(bytes: &[u8]) -> bool {
    let mut offset = 2;
    while offset + 4 <= bytes.len() {
        if bytes[offset] != 0xFF {
            return false;
        }
        let marker = bytes[offset + 1];
        match marker {
            // Fill bytes
            0xFF => {
                offset += 1;
                continue;
            }
            // Start of scan / end of image: no more headers
            0xDA | 0xD9 => return false,
            // Standalone markers without a length
            0x01 | 0xD0..=0xD7 => {
                offset += 2;
                continue;
            }
            _ => {}
        }
        let length = u16::from_be_bytes([bytes[offset + 2], bytes[offset + 3]]) as usize;
        if length < 2 {
            return false;
        }
        let payload_start = offset + 4;
        if marker == 0xE2 && bytes.get(payload_start..payload_start + 4) == Some(&b"MPF\0"[..]) {
            return true;
        }
        offset += 2 + length;
    }
    false
}

/// Read width and height without decoding pixel data.
pub fn header_dimensions(bytes: &[u8], format: SourceFormat) -> PipelineResult<(u32, u32)> {
    if format.is_heif_family() {
        return heif_dimensions(bytes).ok_or_else(|| {
            PipelineError::collaborator("header", format!("no image extent found in {format} container"))
        });
    }

    let codec = format.codec().ok_or_else(|| {
        PipelineError::collaborator("header", format!("no header reader for {format}"))
    })?;
    image::ImageReader::with_format(Cursor::new(bytes), codec)
        .into_dimensions()
        .map_err(|e| PipelineError::collaborator("header", e))
}

/// Find the largest `ispe` (image spatial extent) property in a HEIF
/// container. Thumbnails carry their own `ispe`, so the primary image is
/// taken to be the biggest one.
fn heif_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut best: Option<(u32, u32)> = None;
    collect_ispe(bytes, &mut best);
    best
}

fn collect_ispe(data: &[u8], best: &mut Option<(u32, u32)>) {
    let mut offset = 0;
    while offset + 8 <= data.len() {
        let Some(size32) = read_u32(data, offset) else {
            return;
        };
        let kind = &data[offset + 4..offset + 8];
        let remaining = data.len() - offset;
        let (header_len, box_len) = match size32 {
            0 => (8, remaining),
            1 => match read_u64(data, offset + 8).map(usize::try_from) {
                Some(Ok(large)) => (16, large),
                _ => return,
            },
            n => (8, n as usize),
        };
        // A box may not claim more bytes than are left in its parent
        if box_len < header_len || box_len > remaining {
            return;
        }
        let body = &data[offset + header_len..offset + box_len];

        match kind {
            // Full boxes: skip version + flags before the children
            b"meta" if body.len() >= 4 => collect_ispe(&body[4..], best),
            b"iprp" | b"ipco" => collect_ispe(body, best),
            b"ispe" => {
                if let (Some(w), Some(h)) = (read_u32(body, 4), read_u32(body, 8)) {
                    let area = u64::from(w) * u64::from(h);
                    let best_area = best.map(|(bw, bh)| u64::from(bw) * u64::from(bh));
                    if best_area.map_or(true, |a| area > a) {
                        *best = Some((w, h));
                    }
                }
            }
            _ => {}
        }
        offset += box_len;
    }
}

fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let slice = data.get(offset..offset + 4)?;
    Some(u32::from_be_bytes([slice[0], slice[1], slice[2], slice[3]]))
}

fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let slice = data.get(offset..offset + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(slice);
    Some(u64::from_be_bytes(buf))
}
