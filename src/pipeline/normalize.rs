//! Image normalization: decode raw bytes, classify the color mode, and
//! re-encode for a target with that target's alpha policy.
//!
//! ## Alpha policy
//!
//! A decoded image is *alpha-bearing* when its pixel format carries a
//! transparency channel (RGBA/LA; palette transparency is expanded to
//! RGBA by the decoders). The policy per target:
//!
//! * **WEBP** — alpha-bearing sources stay RGBA, opaque sources become
//!   RGB. Alpha is never flattened.
//! * **JPEG** — the format has no alpha support, so alpha-bearing sources
//!   are composited onto a solid white canvas using their own alpha as
//!   the blend mask before conversion to RGB. Writing alpha data into
//!   JPEG is never attempted.
//!
//! JPEG quality is fixed at 95 and is not a configuration knob.

use crate::error::RowError;
use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::debug;

/// Fixed JPEG output quality on the 0–100 scale.
const JPEG_QUALITY: u8 = 95;

/// The two output encodings a content root can be keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageEncoding {
    WebP,
    Jpeg,
}

impl ImageEncoding {
    /// File extension without the dot.
    pub fn extension(self) -> &'static str {
        match self {
            ImageEncoding::WebP => "webp",
            ImageEncoding::Jpeg => "jpeg",
        }
    }

    /// Filename suffix used by the archiver's filter.
    pub fn suffix(self) -> &'static str {
        match self {
            ImageEncoding::WebP => ".webp",
            ImageEncoding::Jpeg => ".jpeg",
        }
    }
}

/// A decoded image with its color mode made explicit.
///
/// Created and dropped within a single row's processing; never shared
/// across rows.
#[derive(Debug)]
pub struct NormalizedImage {
    image: DynamicImage,
    alpha_bearing: bool,
}

impl NormalizedImage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// True when the source pixel format carried a transparency channel.
    pub fn alpha_bearing(&self) -> bool {
        self.alpha_bearing
    }
}

/// Encoded output for one (identifier, encoding) pair, ready to stage.
pub struct EncodedArtifact {
    /// Sanitized filename stem.
    pub stem: String,
    pub encoding: ImageEncoding,
    pub bytes: Vec<u8>,
}

impl EncodedArtifact {
    /// Filename this artifact stages as: `<stem>.<ext>`.
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.stem, self.encoding.extension())
    }
}

/// Decode raw bytes into a [`NormalizedImage`].
///
/// A corrupt or unsupported payload yields [`RowError::Decode`], which
/// aborts processing for that row only.
pub fn decode(bytes: &[u8]) -> Result<NormalizedImage, RowError> {
    let image = image::load_from_memory(bytes).map_err(|e| RowError::Decode {
        detail: e.to_string(),
    })?;
    let alpha_bearing = image.color().has_alpha();
    debug!(
        "Decoded {}x{} ({})",
        image.width(),
        image.height(),
        if alpha_bearing { "alpha" } else { "opaque" }
    );
    Ok(NormalizedImage {
        image,
        alpha_bearing,
    })
}

/// Re-encode a normalized image for `encoding`, applying that encoding's
/// alpha policy.
pub fn encode(
    normalized: &NormalizedImage,
    stem: &str,
    encoding: ImageEncoding,
) -> Result<EncodedArtifact, RowError> {
    let bytes = match encoding {
        ImageEncoding::WebP => encode_webp(normalized)?,
        ImageEncoding::Jpeg => encode_jpeg(normalized)?,
    };
    Ok(EncodedArtifact {
        stem: stem.to_string(),
        encoding,
        bytes,
    })
}

/// Decode and encode in one step: the normalizer contract used by the
/// orchestrator for both the per-row WEBP pass and the JPEG conversion
/// pass.
pub fn normalize(
    bytes: &[u8],
    stem: &str,
    encoding: ImageEncoding,
) -> Result<EncodedArtifact, RowError> {
    let normalized = decode(bytes)?;
    encode(&normalized, stem, encoding)
}

fn encode_webp(normalized: &NormalizedImage) -> Result<Vec<u8>, RowError> {
    // RGBA for alpha-bearing sources, RGB for opaque ones; the WEBP
    // encoder accepts exactly these two layouts.
    let canonical = if normalized.alpha_bearing {
        DynamicImage::ImageRgba8(normalized.image.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(normalized.image.to_rgb8())
    };

    let mut buf = Vec::new();
    canonical
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::WebP)
        .map_err(|e| RowError::Decode {
            detail: format!("WEBP encode failed: {e}"),
        })?;
    Ok(buf)
}

fn encode_jpeg(normalized: &NormalizedImage) -> Result<Vec<u8>, RowError> {
    let rgb = if normalized.alpha_bearing {
        flatten_onto_white(&normalized.image.to_rgba8())
    } else {
        normalized.image.to_rgb8()
    };

    let mut buf = Vec::new();
    let mut cursor = Cursor::new(&mut buf);
    let encoder = JpegEncoder::new_with_quality(&mut cursor, JPEG_QUALITY);
    DynamicImage::ImageRgb8(rgb)
        .write_with_encoder(encoder)
        .map_err(|e| RowError::Decode {
            detail: format!("JPEG encode failed: {e}"),
        })?;
    Ok(buf)
}

/// Composite an RGBA image onto an opaque white canvas of identical
/// dimensions, using the image's own alpha channel as the blend mask.
fn flatten_onto_white(rgba: &RgbaImage) -> RgbImage {
    let mut out = RgbImage::new(rgba.width(), rgba.height());
    for (dst, src) in out.pixels_mut().zip(rgba.pixels()) {
        let a = src[3] as u32;
        for c in 0..3 {
            // Rounding blend of channel over white: c*a + 255*(1-a).
            dst[c] = ((src[c] as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{LumaA, Rgb, Rgba};

    fn png_bytes(img: DynamicImage) -> Vec<u8> {
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn opaque_red_png(w: u32, h: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgb8(RgbImage::from_pixel(
            w,
            h,
            Rgb([200, 30, 30]),
        )))
    }

    fn transparent_png(w: u32, h: u32) -> Vec<u8> {
        png_bytes(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            w,
            h,
            Rgba([200, 30, 30, 0]),
        )))
    }

    #[test]
    fn opaque_png_is_not_alpha_bearing() {
        let n = decode(&opaque_red_png(8, 8)).unwrap();
        assert!(!n.alpha_bearing());
        assert_eq!((n.width(), n.height()), (8, 8));
    }

    #[test]
    fn rgba_png_is_alpha_bearing() {
        let n = decode(&transparent_png(8, 8)).unwrap();
        assert!(n.alpha_bearing());
    }

    #[test]
    fn gray_alpha_png_is_alpha_bearing() {
        let img = image::GrayAlphaImage::from_pixel(4, 4, LumaA([90, 120]));
        let n = decode(&png_bytes(DynamicImage::ImageLumaA8(img))).unwrap();
        assert!(n.alpha_bearing());
    }

    #[test]
    fn garbage_bytes_yield_decode_error() {
        let err = decode(b"definitely not an image").unwrap_err();
        assert!(matches!(err, RowError::Decode { .. }), "got: {err:?}");
    }

    #[test]
    fn webp_preserves_alpha_channel() {
        let artifact = normalize(&transparent_png(8, 8), "A1", ImageEncoding::WebP).unwrap();
        assert_eq!(artifact.file_name(), "A1.webp");

        let round = image::load_from_memory(&artifact.bytes).unwrap();
        assert!(round.color().has_alpha());
        assert_eq!(round.to_rgba8().get_pixel(3, 3)[3], 0, "alpha must survive");
    }

    #[test]
    fn webp_opaque_source_stays_opaque() {
        let artifact = normalize(&opaque_red_png(8, 8), "A1", ImageEncoding::WebP).unwrap();
        let round = image::load_from_memory(&artifact.bytes).unwrap();
        assert!(!round.color().has_alpha());
    }

    #[test]
    fn jpeg_flattens_transparency_to_pure_white() {
        let artifact = normalize(&transparent_png(16, 16), "A1", ImageEncoding::Jpeg).unwrap();
        assert_eq!(artifact.file_name(), "A1.jpeg");

        let round = image::load_from_memory(&artifact.bytes).unwrap();
        assert!(!round.color().has_alpha());
        let rgb = round.to_rgb8();
        for p in rgb.pixels() {
            assert_eq!((p[0], p[1], p[2]), (255, 255, 255));
        }
    }

    #[test]
    fn jpeg_opaque_source_converts_directly() {
        let artifact = normalize(&opaque_red_png(16, 16), "A1", ImageEncoding::Jpeg).unwrap();
        let rgb = image::load_from_memory(&artifact.bytes).unwrap().to_rgb8();
        let p = rgb.get_pixel(8, 8);
        assert!(p[0] > 180 && p[1] < 60 && p[2] < 60, "got: {p:?}");
    }

    #[test]
    fn flatten_blends_partial_alpha_over_white() {
        let rgba = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 128]));
        let rgb = flatten_onto_white(&rgba);
        let p = rgb.get_pixel(0, 0);
        assert_eq!(p[0], 255);
        assert!((126..=129).contains(&p[1]), "got: {p:?}");
        assert!((126..=129).contains(&p[2]), "got: {p:?}");
    }

    #[test]
    fn flatten_keeps_fully_opaque_pixels() {
        let rgba = RgbaImage::from_pixel(1, 1, Rgba([12, 200, 99, 255]));
        let rgb = flatten_onto_white(&rgba);
        assert_eq!(rgb.get_pixel(0, 0), &Rgb([12, 200, 99]));
    }
}
