//! Broadcast media: one upload, many sends
//!
//! Inline images are uploaded once, to the first target, and every other
//! target receives the file id Telegram handed back.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

use crate::channels::{OutgoingPayload, PhotoSource, Transport};
use crate::{Error, Result};

/// Where a broadcast image comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// `data:<mime>;base64,<payload>` stored with the task
    Inline { mime_type: String, encoded: String },
    /// Remote URL or an already-uploaded file id
    Remote(String),
}

impl ImageSource {
    /// Classify a stored image string
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if let Some(rest) = raw.strip_prefix("data:") {
            if let Some((meta, encoded)) = rest.split_once(',') {
                if let Some(mime_type) = meta.strip_suffix(";base64") {
                    let mime_type = if mime_type.is_empty() {
                        "image/jpeg"
                    } else {
                        mime_type
                    };
                    return Self::Inline {
                        mime_type: mime_type.to_string(),
                        encoded: encoded.to_string(),
                    };
                }
            }
        }
        Self::Remote(raw.to_string())
    }

    /// Decode inline bytes
    ///
    /// # Errors
    ///
    /// Returns error if the payload is not valid base64
    pub fn decode(encoded: &str) -> Result<Vec<u8>> {
        STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Validation(format!("image is not valid base64: {e}")))
    }
}

/// A payload ready for the send loop
#[derive(Debug, Clone)]
pub struct PreparedBroadcast {
    /// What every remaining target receives
    pub payload: OutgoingPayload,
    /// Targets already reached while preparing (the upload target)
    pub delivered: usize,
}

/// Resolve the image so the send loop never re-uploads it
///
/// For an inline image this sends the full payload to `targets[0]` and
/// returns a payload referencing the uploaded file id, with `delivered = 1`.
///
/// # Errors
///
/// Returns `Error::Validation` if the inline image cannot be decoded, and
/// `Error::Upload` if Telegram rejects the upload or returns no file id.
pub async fn prepare(
    transport: &dyn Transport,
    mut payload: OutgoingPayload,
    image: Option<&str>,
    targets: &[i64],
) -> Result<PreparedBroadcast> {
    let Some(image) = image.filter(|i| !i.trim().is_empty()) else {
        return Ok(PreparedBroadcast {
            payload,
            delivered: 0,
        });
    };

    let (mime_type, encoded) = match ImageSource::parse(image) {
        ImageSource::Remote(url) => {
            payload.photo = Some(PhotoSource::Reference(url));
            return Ok(PreparedBroadcast {
                payload,
                delivered: 0,
            });
        }
        ImageSource::Inline { mime_type, encoded } => (mime_type, encoded),
    };

    let Some(&first) = targets.first() else {
        return Ok(PreparedBroadcast {
            payload,
            delivered: 0,
        });
    };

    let bytes = ImageSource::decode(&encoded)?;
    payload.photo = Some(PhotoSource::Upload { bytes, mime_type });

    let delivery = payload
        .deliver(transport, first, None)
        .await
        .map_err(|e| Error::Upload(e.to_string()))?;
    let file_id = delivery
        .photo_file_id
        .ok_or_else(|| Error::Upload("no file id returned for uploaded photo".to_string()))?;

    tracing::debug!(chat_id = first, "broadcast image uploaded");
    payload.photo = Some(PhotoSource::Reference(file_id));
    Ok(PreparedBroadcast {
        payload,
        delivered: 1,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_data_url() {
        let source = ImageSource::parse("data:image/png;base64,aGVsbG8=");
        assert_eq!(
            source,
            ImageSource::Inline {
                mime_type: "image/png".to_string(),
                encoded: "aGVsbG8=".to_string(),
            }
        );
        assert_eq!(ImageSource::decode("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn urls_and_file_ids_are_remote() {
        assert_eq!(
            ImageSource::parse("https://cdn.example.com/a.jpg"),
            ImageSource::Remote("https://cdn.example.com/a.jpg".to_string())
        );
        assert_eq!(
            ImageSource::parse("AgACAgQAAxkBAAIB"),
            ImageSource::Remote("AgACAgQAAxkBAAIB".to_string())
        );
    }

    #[test]
    fn rejects_bad_base64() {
        assert!(ImageSource::decode("***").is_err());
    }
}
