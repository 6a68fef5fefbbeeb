use std::fmt;
use std::sync::Arc;

use crate::errors::{Error, Result};

const PNG_SIGNATURE: &[u8] = b"\x89PNG\r\n\x1a\n";
const GIF87_SIGNATURE: &[u8] = b"GIF87a";
const GIF89_SIGNATURE: &[u8] = b"GIF89a";
const JPEG_SOI: &[u8] = &[0xFF, 0xD8];
const BMP_SIGNATURE: &[u8] = b"BM";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
    Bmp,
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Gif => "GIF",
            ImageFormat::Bmp => "BMP",
        };
        f.write_str(name)
    }
}

/// A decoded picture: its format and pixel size, plus the encoded bytes for whoever renders it.
///
/// Cloning is cheap, the bytes are shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    format: ImageFormat,
    width: u32,
    height: u32,
    data: Arc<[u8]>,
}

impl Image {
    /// Recognise the format of `data` and read its dimensions from the header.
    ///
    /// Anything that is not a PNG, JPEG, GIF or BMP with non-zero dimensions fails with
    /// `Error::ImageDataMissing`.
    pub fn decode(data: &[u8]) -> Result<Image> {
        let (format, (width, height)) = if data.starts_with(PNG_SIGNATURE) {
            (ImageFormat::Png, png_dimensions(data)?)
        } else if data.starts_with(GIF87_SIGNATURE) || data.starts_with(GIF89_SIGNATURE) {
            (ImageFormat::Gif, gif_dimensions(data)?)
        } else if data.starts_with(JPEG_SOI) {
            (ImageFormat::Jpeg, jpeg_dimensions(data)?)
        } else if data.starts_with(BMP_SIGNATURE) {
            (ImageFormat::Bmp, bmp_dimensions(data)?)
        } else {
            return Err(Error::ImageDataMissing);
        };

        if width == 0 || height == 0 {
            return Err(Error::ImageDataMissing);
        }

        Ok(Image {
            format,
            width,
            height,
            data: Arc::from(data),
        })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// The encoded bytes, as received
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

fn be_u16(data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(Error::ImageDataMissing)
}

fn be_u32(data: &[u8], at: usize) -> Result<u32> {
    data.get(at..at + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::ImageDataMissing)
}

fn le_u16(data: &[u8], at: usize) -> Result<u16> {
    data.get(at..at + 2)
        .map(|b| u16::from_le_bytes([b[0], b[1]]))
        .ok_or(Error::ImageDataMissing)
}

fn le_i32(data: &[u8], at: usize) -> Result<i32> {
    data.get(at..at + 4)
        .map(|b| i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(Error::ImageDataMissing)
}

/// The first chunk must be IHDR, holding width and height
fn png_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    if data.get(12..16) != Some(b"IHDR".as_slice()) {
        return Err(Error::ImageDataMissing);
    }
    Ok((be_u32(data, 16)?, be_u32(data, 20)?))
}

/// Logical screen size follows the signature
fn gif_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    Ok((le_u16(data, 6)? as u32, le_u16(data, 8)? as u32))
}

/// Height is stored signed, negative meaning top-down rows
fn bmp_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    let width = le_i32(data, 18)?;
    let height = le_i32(data, 22)?;
    if width <= 0 {
        return Err(Error::ImageDataMissing);
    }
    Ok((width as u32, height.unsigned_abs()))
}

/// Walk the marker segments up to the first start-of-frame
fn jpeg_dimensions(data: &[u8]) -> Result<(u32, u32)> {
    let mut pos = 2;
    loop {
        // markers may be padded with any number of 0xFF
        while data.get(pos) == Some(&0xFF) && data.get(pos + 1) == Some(&0xFF) {
            pos += 1;
        }
        if data.get(pos) != Some(&0xFF) {
            return Err(Error::ImageDataMissing);
        }
        let marker = *data.get(pos + 1).ok_or(Error::ImageDataMissing)?;
        pos += 2;

        match marker {
            // standalone markers carry no length
            0x01 | 0xD0..=0xD7 => continue,
            // end of image or start of scan before any frame header
            0xD9 | 0xDA => return Err(Error::ImageDataMissing),
            // SOF0..SOF15, except DHT, JPG and DAC which share the range
            0xC0..=0xCF if marker != 0xC4 && marker != 0xC8 && marker != 0xCC => {
                let height = be_u16(data, pos + 3)?;
                let width = be_u16(data, pos + 5)?;
                return Ok((width as u32, height as u32));
            }
            _ => {
                let length = be_u16(data, pos)? as usize;
                if length < 2 {
                    return Err(Error::ImageDataMissing);
                }
                pos += length;
            }
        }
    }
}

/// A valid 1x1 transparent PNG, served by the development backend as every item picture
pub const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44, 0x52,
    0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F, 0x15, 0xC4,
    0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00, 0x01, 0x00, 0x00,
    0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49, 0x45, 0x4E, 0x44, 0xAE,
    0x42, 0x60, 0x82,
];

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_decode_png() {
        let image = Image::decode(PLACEHOLDER_PNG).unwrap();
        assert_eq!(image.format(), ImageFormat::Png);
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.data(), PLACEHOLDER_PNG);
    }

    #[test]
    fn test_decode_gif() {
        let mut gif = b"GIF89a".to_vec();
        gif.extend_from_slice(&[0x40, 0x01, 0xF0, 0x00]);
        gif.extend_from_slice(&[0; 16]);
        let image = Image::decode(&gif).unwrap();
        assert_eq!(image.format(), ImageFormat::Gif);
        assert_eq!((image.width(), image.height()), (320, 240));
    }

    #[test]
    fn test_decode_jpeg() {
        let mut jpeg = vec![0xFF, 0xD8];
        // APP0 segment of 16 bytes
        jpeg.extend_from_slice(&[0xFF, 0xE0, 0x00, 0x10]);
        jpeg.extend_from_slice(&[0; 14]);
        // SOF0: length, precision, height 480, width 640
        jpeg.extend_from_slice(&[0xFF, 0xC0, 0x00, 0x11, 0x08, 0x01, 0xE0, 0x02, 0x80, 0x03]);
        jpeg.extend_from_slice(&[0; 9]);
        let image = Image::decode(&jpeg).unwrap();
        assert_eq!(image.format(), ImageFormat::Jpeg);
        assert_eq!((image.width(), image.height()), (640, 480));
    }

    #[test]
    fn test_decode_bmp() {
        let mut bmp = b"BM".to_vec();
        bmp.extend_from_slice(&[0; 16]);
        bmp.extend_from_slice(&55i32.to_le_bytes());
        bmp.extend_from_slice(&(-55i32).to_le_bytes());
        let image = Image::decode(&bmp).unwrap();
        assert_eq!(image.format(), ImageFormat::Bmp);
        assert_eq!((image.width(), image.height()), (55, 55));
    }

    #[test]
    fn test_reject_malformed() {
        let truncated_png = &PLACEHOLDER_PNG[..18];
        let mut zero_png = PLACEHOLDER_PNG.to_vec();
        zero_png[16..20].copy_from_slice(&[0, 0, 0, 0]);
        let jpeg_without_frame = [0xFF, 0xD8, 0xFF, 0xD9];

        let samples: [&[u8]; 6] = [
            b"",
            b"not an image",
            br#"{"error":"not found"}"#,
            truncated_png,
            &zero_png,
            &jpeg_without_frame,
        ];
        for data in samples {
            assert!(matches!(Image::decode(data), Err(Error::ImageDataMissing)));
        }
    }
}
