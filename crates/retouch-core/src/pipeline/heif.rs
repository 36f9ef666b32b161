//! HEIC/HEIF decoding through libheif.

use image::{DynamicImage, RgbImage, RgbaImage};
use libheif_rs::{ColorSpace, HeifContext, ImageHandle, LibHeif, RgbChroma};

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Image, ImageMetadata, SourceFormat};

/// Decode the primary image of a HEIF container to 8-bit RGB or RGBA.
pub fn decode(bytes: &[u8], format: SourceFormat) -> PipelineResult<Image> {
    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_bytes(bytes).map_err(|e| PipelineError::collaborator("heif", e))?;
    let handle = ctx
        .primary_image_handle()
        .map_err(|e| PipelineError::collaborator("heif", e))?;

    let has_alpha = handle.has_alpha_channel();
    let chroma = if has_alpha {
        RgbChroma::Rgba
    } else {
        RgbChroma::Rgb
    };
    let decoded = lib
        .decode(&handle, ColorSpace::Rgb(chroma), None)
        .map_err(|e| PipelineError::collaborator("heif", e))?;

    let planes = decoded.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| PipelineError::collaborator("heif", "decoder returned no interleaved plane"))?;
    let channels = if has_alpha { 4 } else { 3 };
    let packed = pack_rows(plane.data, plane.stride, plane.width, plane.height, channels)?;

    let pixels = if has_alpha {
        RgbaImage::from_raw(plane.width, plane.height, packed).map(DynamicImage::ImageRgba8)
    } else {
        RgbImage::from_raw(plane.width, plane.height, packed).map(DynamicImage::ImageRgb8)
    }
    .ok_or_else(|| PipelineError::collaborator("heif", "plane size does not match dimensions"))?;

    let mut metadata = ImageMetadata::new(format);
    metadata.exif = read_exif(&handle);
    metadata.icc_profile = handle.color_profile_raw().map(|profile| profile.data);
    Ok(Image::new(pixels, metadata))
}

/// First EXIF block, reduced to the bare TIFF structure. HEIF stores a
/// big-endian offset to the TIFF header in front of the payload.
fn read_exif(handle: &ImageHandle) -> Option<Vec<u8>> {
    let id = handle.metadata_block_ids(b"Exif").into_iter().next()?;
    let block = match handle.metadata(id) {
        Ok(block) => block,
        Err(e) => {
            tracing::debug!("Ignoring unreadable EXIF block: {e}");
            return None;
        }
    };
    let offset_bytes: [u8; 4] = block.get(..4)?.try_into().ok()?;
    let start = 4usize.checked_add(usize::try_from(u32::from_be_bytes(offset_bytes)).ok()?)?;
    block.get(start..).filter(|tiff| !tiff.is_empty()).map(<[u8]>::to_vec)
}

/// Copy `height` rows of `width * channels` bytes out of a plane whose rows
/// are `stride` bytes apart.
fn pack_rows(
    data: &[u8],
    stride: usize,
    width: u32,
    height: u32,
    channels: usize,
) -> PipelineResult<Vec<u8>> {
    let row = (width as usize)
        .checked_mul(channels)
        .filter(|&row| row <= stride)
        .ok_or_else(|| PipelineError::collaborator("heif", "row wider than plane stride"))?;
    let rows = height as usize;

    let mut packed = Vec::with_capacity(row * rows);
    for y in 0..rows {
        let start = y * stride;
        let line = data
            .get(start..start + row)
            .ok_or_else(|| PipelineError::collaborator("heif", "plane shorter than its dimensions"))?;
        packed.extend_from_slice(line);
    }
    Ok(packed)
}
