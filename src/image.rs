//! Image payload types shared by the clients, the loop and storage.
//!
//! Formats are identified by magic bytes; nothing here decodes pixels.

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Encodings the pipeline understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
}

impl ImageFormat {
    /// Sniffs the format from the leading bytes of a payload.
    pub fn detect(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            Some(Self::Png)
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            Some(Self::Jpeg)
        } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            Some(Self::Webp)
        } else {
            None
        }
    }

    /// Maps a MIME type or bare name (`image/png`, `jpg`) to a format.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let name = mime.trim().to_lowercase();
        let name = name.strip_prefix("image/").unwrap_or(&name);
        match name.split(';').next().unwrap_or_default() {
            "png" => Some(Self::Png),
            "jpeg" | "jpg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// File extension used for persisted images.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// Whether the format is accepted as a source photo.
    pub fn is_source_format(self) -> bool {
        matches!(self, Self::Jpeg | Self::Png)
    }
}

/// One of the two input photos (person or product). Read-only for the run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceImage {
    format: ImageFormat,
    bytes: Vec<u8>,
}

impl SourceImage {
    /// Validates raw bytes as a JPEG or PNG photo.
    ///
    /// When `declared` is given it must agree with the sniffed format.
    pub fn decode(
        role: &str,
        bytes: Vec<u8>,
        declared: Option<ImageFormat>,
    ) -> Result<Self, ToolError> {
        if bytes.is_empty() {
            return Err(ToolError::InvalidInput(format!("{role} image is empty")));
        }
        let format = ImageFormat::detect(&bytes).ok_or_else(|| {
            ToolError::InvalidInput(format!("{role} image is not a recognizable JPEG or PNG"))
        })?;
        if !format.is_source_format() {
            return Err(ToolError::InvalidInput(format!(
                "{role} image must be JPEG or PNG, got {}",
                format.extension()
            )));
        }
        if let Some(declared) = declared {
            if declared != format {
                return Err(ToolError::InvalidInput(format!(
                    "{role} image declared as {} but contains {}",
                    declared.extension(),
                    format.extension()
                )));
            }
        }
        Ok(Self { format, bytes })
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// Raw output of one image-synthesis call, before it is tied to an index.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedImage {
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// A synthesized image tagged with the 1-based variant index it renders.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedImage {
    pub index: u8,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn new(index: u8, image: SynthesizedImage) -> Self {
        Self {
            index,
            format: image.format,
            bytes: image.bytes,
        }
    }

    /// Persisted file name, `generated_ugc_image_{index}.{ext}`.
    pub fn file_name(&self) -> String {
        output_file_name(self.index, self.format)
    }
}

/// Naming convention shared with storage backends.
pub fn output_file_name(index: u8, format: ImageFormat) -> String {
    format!(
        "{}_{}.{}",
        crate::constants::OUTPUT_FILE_STEM,
        index,
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 13];
    const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0, 16, b'J', b'F', b'I', b'F'];

    #[test]
    fn test_detect_formats() {
        assert_eq!(ImageFormat::detect(PNG), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::detect(JPEG), Some(ImageFormat::Jpeg));
        assert_eq!(
            ImageFormat::detect(b"RIFF\0\0\0\0WEBPVP8 "),
            Some(ImageFormat::Webp)
        );
        assert_eq!(ImageFormat::detect(b"GIF89a"), None);
    }

    #[test]
    fn test_from_mime() {
        assert_eq!(ImageFormat::from_mime("image/png"), Some(ImageFormat::Png));
        assert_eq!(ImageFormat::from_mime("image/jpeg; q=1"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("JPG"), Some(ImageFormat::Jpeg));
        assert_eq!(ImageFormat::from_mime("application/json"), None);
    }

    #[test]
    fn test_source_image_rejects_empty_and_unknown() {
        let err = SourceImage::decode("person", Vec::new(), None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("empty")));

        let err = SourceImage::decode("product", b"not an image".to_vec(), None).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(_)));
    }

    #[test]
    fn test_source_image_rejects_webp_and_mismatch() {
        let webp = b"RIFF\0\0\0\0WEBPVP8 ".to_vec();
        assert!(SourceImage::decode("person", webp, None).is_err());

        let err =
            SourceImage::decode("person", PNG.to_vec(), Some(ImageFormat::Jpeg)).unwrap_err();
        assert!(matches!(err, ToolError::InvalidInput(msg) if msg.contains("declared as jpg")));
    }

    #[test]
    fn test_output_file_name_convention() {
        let image = GeneratedImage::new(
            3,
            SynthesizedImage {
                format: ImageFormat::Png,
                bytes: PNG.to_vec(),
            },
        );
        assert_eq!(image.file_name(), "generated_ugc_image_3.png");
        assert_eq!(
            output_file_name(1, ImageFormat::Jpeg),
            "generated_ugc_image_1.jpg"
        );
    }
}
