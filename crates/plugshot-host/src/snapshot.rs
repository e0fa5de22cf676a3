//! PNG output for captured editor frames.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tracing::debug;

use crate::error::HostError;

/// Tightly packed 8-bit RGBA frame.
pub struct RgbaImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl RgbaImage {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        debug_assert_eq!(pixels.len(), width as usize * height as usize * 4);
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Frame filled with a single color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let mut pixels = Vec::with_capacity(width as usize * height as usize * 4);
        for _ in 0..width as usize * height as usize {
            pixels.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            pixels,
        }
    }
}

/// Encodes `image` to `path`, replacing any existing file.
///
/// Every failure is reported, including errors surfaced while flushing the
/// final chunks. A capture run must not claim success over a truncated or
/// missing file.
pub fn write_png(image: &RgbaImage, path: &Path) -> Result<(), HostError> {
    let file = File::create(path).map_err(|source| HostError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    let writer = BufWriter::new(file);

    let mut encoder = png::Encoder::new(writer, image.width, image.height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);

    let encode_err = |source: png::EncodingError| HostError::PngEncode {
        path: path.to_path_buf(),
        source,
    };
    let mut png_writer = encoder.write_header().map_err(encode_err)?;
    png_writer.write_image_data(&image.pixels).map_err(encode_err)?;
    png_writer.finish().map_err(encode_err)?;

    debug!(
        path = %path.display(),
        width = image.width,
        height = image.height,
        "wrote editor snapshot"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

    #[test]
    fn writes_a_decodable_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        let image = RgbaImage::solid(4, 3, [10, 20, 30, 255]);

        write_png(&image, &path).unwrap();

        let decoder = png::Decoder::new(File::open(&path).unwrap());
        let mut reader = decoder.read_info().unwrap();
        let mut buf = vec![0u8; reader.output_buffer_size()];
        let info = reader.next_frame(&mut buf).unwrap();
        assert_eq!(info.width, 4);
        assert_eq!(info.height, 3);
        assert_eq!(info.color_type, png::ColorType::Rgba);
        buf.truncate(info.buffer_size());
        assert_eq!(buf, image.pixels);
    }

    #[test]
    fn replaces_an_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        fs::write(&path, b"not a png").unwrap();

        write_png(&RgbaImage::solid(2, 2, [0, 0, 0, 255]), &path).unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(&bytes[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn missing_parent_directory_is_a_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("frame.png");

        let err = write_png(&RgbaImage::solid(2, 2, [0, 0, 0, 255]), &path).unwrap_err();
        assert!(matches!(err, HostError::FileWrite { .. }), "{err}");
    }
}
