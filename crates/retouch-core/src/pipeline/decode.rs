//! Full raster decoding with EXIF and ICC capture.

use image::{DynamicImage, ImageDecoder};
use std::io::Cursor;

use crate::error::{PipelineError, PipelineResult};
use crate::types::{Image, ImageMetadata, SourceFormat};

/// Decode bytes whose format has already been sniffed and approved.
///
/// EXIF and ICC payloads are lifted off the decoder before the pixels are
/// read so that the encoder can forward them later. A metadata read failure
/// only drops that piece of metadata; a pixel decode failure fails the job.
pub fn decode(bytes: &[u8], format: SourceFormat) -> PipelineResult<Image> {
    #[cfg(feature = "heif")]
    if matches!(format, SourceFormat::Heic | SourceFormat::Heif) {
        return super::heif::decode(bytes, format);
    }

    let codec = format.codec().ok_or_else(|| {
        PipelineError::collaborator("decode", format!("no decoder available for {format}"))
    })?;

    let mut decoder = image::ImageReader::with_format(Cursor::new(bytes), codec)
        .into_decoder()
        .map_err(|e| PipelineError::collaborator("decode", e))?;

    let mut metadata = ImageMetadata::new(format);
    metadata.icc_profile = match decoder.icc_profile() {
        Ok(profile) => profile,
        Err(e) => {
            tracing::debug!("Ignoring unreadable ICC profile: {e}");
            None
        }
    };
    metadata.exif = match decoder.exif_metadata() {
        Ok(exif) => exif.map(strip_exif_prefix),
        Err(e) => {
            tracing::debug!("Ignoring unreadable EXIF block: {e}");
            None
        }
    };

    let pixels =
        DynamicImage::from_decoder(decoder).map_err(|e| PipelineError::collaborator("decode", e))?;
    Ok(Image::new(pixels, metadata))
}

/// Normalize EXIF to the bare TIFF structure; some codecs hand back the
/// JPEG APP1 `Exif\0\0` identifier along with it.
fn strip_exif_prefix(mut exif: Vec<u8>) -> Vec<u8> {
    const PREFIX: &[u8] = b"Exif\0\0";
    if exif.starts_with(PREFIX) {
        exif.drain(..PREFIX.len());
    }
    exif
}
