use image::{Rgb, RgbImage};
use serde::Deserialize;

use crate::error::DecodeError;

/// Wire shape of the model's inference response.
///
/// The endpoint returns pixel data as a nested numeric array, rows of pixels
/// of `[r, g, b]` channel triples. Channels deserialize as `i64` so that
/// out-of-range values are caught by validation rather than silently wrapped.
#[derive(Debug, Deserialize)]
struct InferencePayload {
    generated_image: Vec<Vec<Vec<i64>>>,
}

/// Decode a raw inference response into an 8-bit RGB image.
///
/// Any malformed payload (invalid JSON, ragged rows, wrong channel count,
/// out-of-range values) is a [`DecodeError`]; nothing is ever persisted for
/// a payload that fails here.
pub fn decode_image(raw: &[u8]) -> Result<RgbImage, DecodeError> {
    let payload: InferencePayload =
        serde_json::from_slice(raw).map_err(|e| DecodeError::Payload(e.to_string()))?;

    let rows = &payload.generated_image;
    let height = rows.len();
    let width = rows.first().map(Vec::len).unwrap_or(0);
    if height == 0 || width == 0 {
        return Err(DecodeError::EmptyImage);
    }

    for (y, row) in rows.iter().enumerate() {
        if row.len() != width {
            return Err(DecodeError::RaggedRows {
                row: y,
                got: row.len(),
                expected: width,
            });
        }
    }

    let mut img = RgbImage::new(width as u32, height as u32);
    for (y, row) in rows.iter().enumerate() {
        for (x, pixel) in row.iter().enumerate() {
            if pixel.len() != 3 {
                return Err(DecodeError::BadPixel {
                    x,
                    y,
                    got: pixel.len(),
                });
            }
            let mut channels = [0u8; 3];
            for (c, &value) in pixel.iter().enumerate() {
                channels[c] = u8::try_from(value)
                    .map_err(|_| DecodeError::ChannelRange { x, y, value })?;
            }
            img.put_pixel(x as u32, y as u32, Rgb(channels));
        }
    }

    Ok(img)
}
