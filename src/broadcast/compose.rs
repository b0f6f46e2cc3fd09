//! Broadcast composition checks and payload building

use super::media::ImageSource;
use crate::channels::{Button, OutgoingPayload};
use crate::db::{Frequency, NewBroadcast};
use crate::{Error, Result};

/// Inline keyboard cap for broadcasts
pub const MAX_BUTTONS: usize = 5;

/// Largest accepted data-URL payload, in encoded characters
pub const MAX_IMAGE_ENCODED_CHARS: usize = 900_000;

/// Largest accepted decoded image
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Check an operator-submitted broadcast
///
/// `scheduled` requires a `scheduled_at`; immediate sends skip that check.
///
/// # Errors
///
/// Returns `Error::Validation` describing the first problem found
pub fn validate(new: &NewBroadcast, scheduled: bool) -> Result<()> {
    let image = new.image.as_deref().map(str::trim).filter(|i| !i.is_empty());

    if new.message.trim().is_empty() && image.is_none() {
        return Err(invalid("a message or an image is required"));
    }

    if let Some(image) = image {
        validate_image(image)?;
    }

    if new.buttons.len() > MAX_BUTTONS {
        return Err(invalid(format!("at most {MAX_BUTTONS} buttons are allowed")));
    }
    if let Some(i) = new
        .buttons
        .iter()
        .position(|b| b.label.trim().is_empty() || b.value.trim().is_empty())
    {
        return Err(invalid(format!("button {} needs a label and a link", i + 1)));
    }

    if new.frequency == Frequency::Custom && new.custom_interval_minutes.is_none_or(|m| m <= 0) {
        return Err(invalid("custom frequency needs a positive interval in minutes"));
    }

    if scheduled && new.scheduled_at.is_none() {
        return Err(invalid("scheduled_at is required"));
    }

    Ok(())
}

fn validate_image(image: &str) -> Result<()> {
    let ImageSource::Inline { encoded, .. } = ImageSource::parse(image) else {
        return Ok(());
    };

    if encoded.len() > MAX_IMAGE_ENCODED_CHARS {
        return Err(invalid(format!(
            "image is too large ({} encoded characters, limit {MAX_IMAGE_ENCODED_CHARS})",
            encoded.len()
        )));
    }

    let bytes = ImageSource::decode(&encoded)?;
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(invalid("image exceeds 5 MB"));
    }
    Ok(())
}

fn invalid(reason: impl Into<String>) -> Error {
    Error::Validation(reason.into())
}

/// Text and buttons shared by every target; the photo is added by `media`
#[must_use]
pub fn payload(message: &str, buttons: &[Button]) -> OutgoingPayload {
    let text = message.trim();
    OutgoingPayload {
        text: (!text.is_empty()).then(|| text.to_string()),
        photo: None,
        buttons: buttons.iter().take(MAX_BUTTONS).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn valid() -> NewBroadcast {
        NewBroadcast {
            message: "Hello".to_string(),
            scheduled_at: Some(Utc::now()),
            ..NewBroadcast::default()
        }
    }

    fn reason(new: &NewBroadcast) -> String {
        match validate(new, true) {
            Err(Error::Validation(msg)) => msg,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_minimal_broadcast() {
        validate(&valid(), true).unwrap();
    }

    #[test]
    fn requires_content() {
        let new = NewBroadcast {
            message: "  ".to_string(),
            ..valid()
        };
        assert!(reason(&new).contains("message or an image"));

        let image_only = NewBroadcast {
            message: String::new(),
            image: Some("https://example.com/a.png".to_string()),
            ..valid()
        };
        validate(&image_only, true).unwrap();
    }

    #[test]
    fn rejects_oversized_inline_image() {
        let new = NewBroadcast {
            image: Some(format!("data:image/png;base64,{}", "A".repeat(900_004))),
            ..valid()
        };
        assert!(reason(&new).contains("too large"));
    }

    #[test]
    fn limits_buttons() {
        let mut new = valid();
        new.buttons = (0..6).map(|i| Button::url(format!("b{i}"), "https://x.io")).collect();
        assert!(reason(&new).contains("at most 5"));

        new.buttons = vec![Button::url("", "https://x.io")];
        assert!(reason(&new).contains("button 1"));
    }

    #[test]
    fn custom_frequency_needs_interval() {
        let new = NewBroadcast {
            frequency: Frequency::Custom,
            custom_interval_minutes: Some(0),
            ..valid()
        };
        assert!(reason(&new).contains("positive interval"));
    }

    #[test]
    fn schedule_required_only_for_scheduled() {
        let new = NewBroadcast {
            scheduled_at: None,
            ..valid()
        };
        assert!(reason(&new).contains("scheduled_at"));
        validate(&new, false).unwrap();
    }

    #[test]
    fn payload_caps_buttons() {
        let buttons: Vec<_> = (0..8).map(|i| Button::url(format!("b{i}"), "https://x.io")).collect();
        let built = payload(" hi ", &buttons);
        assert_eq!(built.text.as_deref(), Some("hi"));
        assert_eq!(built.buttons.len(), MAX_BUTTONS);
        assert!(payload("", &[]).text.is_none());
    }
}
