//! Base64 and data-URL payload decoding

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MediaError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("payload is empty")]
    Empty,
}

/// Decoded upload
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedMedia {
    /// MIME type from the data URL, if one was given
    pub mime_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl DecodedMedia {
    /// Declared MIME type, else one sniffed from the image magic bytes
    pub fn image_mime_type(&self) -> &str {
        if let Some(ref mime) = self.mime_type {
            return mime;
        }
        match self.bytes.as_slice() {
            [0x89, b'P', b'N', b'G', ..] => "image/png",
            [b'G', b'I', b'F', b'8', ..] => "image/gif",
            [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
            _ => "image/jpeg",
        }
    }
}

/// Decode `data:<mime>;base64,<payload>` or bare base64
pub fn decode_payload(input: &str) -> Result<DecodedMedia, MediaError> {
    let input = input.trim();

    let (mime_type, payload) = match input.strip_prefix("data:") {
        Some(rest) => match rest.split_once(',') {
            Some((header, payload)) => {
                let mime = header
                    .split(';')
                    .next()
                    .filter(|m| !m.is_empty())
                    .map(str::to_string);
                (mime, payload)
            }
            None => (None, rest),
        },
        None => (None, input),
    };

    let cleaned: String = payload.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Err(MediaError::Empty);
    }

    let bytes = STANDARD.decode(cleaned.as_bytes())?;
    if bytes.is_empty() {
        return Err(MediaError::Empty);
    }

    Ok(DecodedMedia { mime_type, bytes })
}
