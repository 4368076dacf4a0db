//! Input validation for broadcaster writes
//!
//! Every violation in a payload is collected so the broadcaster sees the
//! whole picture in one round-trip. A rejected write never touches the store.

use crate::models::{ChannelSettings, FadeTrigger, Slot, Snapshot, CROSSFADE_MAX, SNAPSHOT_SCHEMA_VERSION};

// ============================================================================
// Validation limits
// ============================================================================

/// Longest fade a broadcaster may announce
pub const FADE_DURATION_MAX_MS: i64 = 5 * 60 * 1000;

/// How far ahead of the server clock a fade may be announced to start.
/// A trigger further out would hold every viewer's load gate shut.
pub const FADE_START_SKEW_MAX_MS: i64 = 60 * 1000;

/// Maximum length of an external video id
pub const VIDEO_ID_MAX: usize = 128;

/// Maximum length of a video title
pub const VIDEO_TITLE_MAX: usize = 300;

/// Maximum length of any URL stored on a channel
pub const URL_MAX: usize = 2048;

/// Maximum length of a playlist name
pub const PLAYLIST_NAME_MAX: usize = 200;

/// Validation error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid {field}: {message}")]
    Field { field: String, message: String },

    #[error("Multiple validation errors: {0}")]
    Multiple(String),
}

impl ValidationError {
    fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Field {
            field: field.into(),
            message: message.into(),
        }
    }

    fn collect(mut errors: Vec<Self>) -> ValidationResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(Self::Multiple(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )),
        }
    }
}

/// Validation result
pub type ValidationResult<T> = Result<T, ValidationError>;

fn check_time(field: &str, value: f64, errors: &mut Vec<ValidationError>) {
    if !value.is_finite() {
        errors.push(ValidationError::field(field, "must be a finite number"));
    } else if value < 0.0 {
        errors.push(ValidationError::field(field, "must be non-negative"));
    }
}

fn check_crossfade(field: &str, value: i32, errors: &mut Vec<ValidationError>) {
    if !(0..=CROSSFADE_MAX).contains(&value) {
        errors.push(ValidationError::field(
            field,
            format!("must be between 0 and {CROSSFADE_MAX}"),
        ));
    }
}

fn check_fade_trigger(trigger: &FadeTrigger, now_ms: i64, errors: &mut Vec<ValidationError>) {
    check_crossfade("fade_trigger.start_value", trigger.start_value, errors);
    check_crossfade("fade_trigger.end_value", trigger.end_value, errors);
    if trigger.started_at < 0 {
        errors.push(ValidationError::field(
            "fade_trigger.started_at",
            "must be an epoch-millisecond timestamp",
        ));
    } else if trigger.started_at > now_ms.saturating_add(FADE_START_SKEW_MAX_MS) {
        errors.push(ValidationError::field(
            "fade_trigger.started_at",
            format!("must not be more than {FADE_START_SKEW_MAX_MS} ms in the future"),
        ));
    }
    if trigger.duration_ms <= 0 || trigger.duration_ms > FADE_DURATION_MAX_MS {
        errors.push(ValidationError::field(
            "fade_trigger.duration_ms",
            format!("must be between 1 and {FADE_DURATION_MAX_MS}"),
        ));
    }
}

fn check_url(field: &str, url: &str, errors: &mut Vec<ValidationError>) {
    if url.len() > URL_MAX {
        errors.push(ValidationError::field(field, format!("must be at most {URL_MAX} characters")));
    } else if !(url.starts_with("https://") || url.starts_with("http://")) {
        errors.push(ValidationError::field(field, "must be an http(s) URL"));
    }
}

/// Validate a snapshot pushed by a broadcaster, against the server clock
/// `now_ms`
pub fn validate_snapshot(snapshot: &Snapshot, now_ms: i64) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if snapshot.schema_version == 0 || snapshot.schema_version > SNAPSHOT_SCHEMA_VERSION {
        errors.push(ValidationError::field(
            "schema_version",
            format!("unsupported version {} (server supports up to {SNAPSHOT_SCHEMA_VERSION})", snapshot.schema_version),
        ));
    }

    check_crossfade("crossfade_value", snapshot.crossfade_value, &mut errors);
    check_time("player_a_time", snapshot.player_a_time, &mut errors);
    check_time("player_b_time", snapshot.player_b_time, &mut errors);

    for slot in Slot::ALL {
        if let Some(video) = snapshot.video(slot) {
            let field = format!("player_{slot}_video");
            let id = video.external_id.trim();
            if id.is_empty() {
                errors.push(ValidationError::field(format!("{field}.external_id"), "must not be empty"));
            } else if id.len() > VIDEO_ID_MAX {
                errors.push(ValidationError::field(
                    format!("{field}.external_id"),
                    format!("must be at most {VIDEO_ID_MAX} characters"),
                ));
            }
            if video.title.len() > VIDEO_TITLE_MAX {
                errors.push(ValidationError::field(
                    format!("{field}.title"),
                    format!("must be at most {VIDEO_TITLE_MAX} characters"),
                ));
            }
            if let Some(thumb) = &video.thumbnail_url {
                check_url(&format!("{field}.thumbnail_url"), thumb, &mut errors);
            }
        }
    }

    if let Some(started_at) = snapshot.started_at {
        if started_at < 0 {
            errors.push(ValidationError::field("started_at", "must be an epoch-millisecond timestamp"));
        }
    }

    if let Some(trigger) = &snapshot.fade_trigger {
        check_fade_trigger(trigger, now_ms, &mut errors);
    }

    ValidationError::collect(errors)
}

/// Validate channel presentation settings
pub fn validate_settings(settings: &ChannelSettings) -> ValidationResult<()> {
    let mut errors = Vec::new();

    if let Some(url) = &settings.idle_image_url {
        check_url("idle_image_url", url, &mut errors);
    }
    if let Some(name) = &settings.playlist_name {
        if name.len() > PLAYLIST_NAME_MAX {
            errors.push(ValidationError::field(
                "playlist_name",
                format!("must be at most {PLAYLIST_NAME_MAX} characters"),
            ));
        }
    }

    ValidationError::collect(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::VideoRef;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn test_default_snapshot_is_valid() {
        assert!(validate_snapshot(&Snapshot::default(), NOW).is_ok());
    }

    #[test]
    fn test_crossfade_out_of_range() {
        let snapshot = Snapshot {
            crossfade_value: 101,
            ..Snapshot::default()
        };
        let err = validate_snapshot(&snapshot, NOW).unwrap_err();
        assert!(matches!(err, ValidationError::Field { ref field, .. } if field == "crossfade_value"));

        let snapshot = Snapshot {
            crossfade_value: -1,
            ..Snapshot::default()
        };
        assert!(validate_snapshot(&snapshot, NOW).is_err());
    }

    #[test]
    fn test_negative_and_non_finite_times() {
        let snapshot = Snapshot {
            player_a_time: -0.5,
            ..Snapshot::default()
        };
        assert!(validate_snapshot(&snapshot, NOW).is_err());

        let snapshot = Snapshot {
            player_b_time: f64::NAN,
            ..Snapshot::default()
        };
        assert!(validate_snapshot(&snapshot, NOW).is_err());
    }

    #[test]
    fn test_multiple_errors_are_collected() {
        let snapshot = Snapshot {
            crossfade_value: 250,
            player_a_time: -1.0,
            player_b_video: Some(VideoRef::new("  ")),
            ..Snapshot::default()
        };
        match validate_snapshot(&snapshot, NOW) {
            Err(ValidationError::Multiple(msg)) => {
                assert!(msg.contains("crossfade_value"));
                assert!(msg.contains("player_a_time"));
                assert!(msg.contains("player_b_video.external_id"));
            }
            other => panic!("expected multiple errors, got {other:?}"),
        }
    }

    #[test]
    fn test_fade_trigger_bounds() {
        let mut snapshot = Snapshot {
            fade_trigger: Some(FadeTrigger {
                started_at: 1_700_000_000_000,
                start_value: 0,
                end_value: 100,
                duration_ms: 8_000,
            }),
            ..Snapshot::default()
        };
        assert!(validate_snapshot(&snapshot, NOW).is_ok());

        if let Some(trigger) = snapshot.fade_trigger.as_mut() {
            trigger.duration_ms = 0;
        }
        assert!(validate_snapshot(&snapshot, NOW).is_err());
    }

    #[test]
    fn test_fade_trigger_far_in_future_rejected() {
        let trigger = |started_at| Snapshot {
            fade_trigger: Some(FadeTrigger {
                started_at,
                start_value: 0,
                end_value: 100,
                duration_ms: 8_000,
            }),
            ..Snapshot::default()
        };

        // Modest clock skew is tolerated
        assert!(validate_snapshot(&trigger(NOW + 5_000), NOW).is_ok());
        assert!(validate_snapshot(&trigger(NOW + FADE_START_SKEW_MAX_MS), NOW).is_ok());

        let err = validate_snapshot(&trigger(NOW + FADE_START_SKEW_MAX_MS + 1), NOW).unwrap_err();
        assert!(matches!(err, ValidationError::Field { ref field, .. } if field == "fade_trigger.started_at"));
    }

    #[test]
    fn test_future_schema_version_rejected() {
        let snapshot = Snapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION + 1,
            ..Snapshot::default()
        };
        assert!(validate_snapshot(&snapshot, NOW).is_err());
    }

    #[test]
    fn test_settings_url_scheme() {
        let settings = ChannelSettings {
            idle_image_url: Some("javascript:alert(1)".to_string()),
            ..ChannelSettings::default()
        };
        assert!(validate_settings(&settings).is_err());

        let settings = ChannelSettings {
            idle_image_url: Some("https://cdn.example.com/idle.png".to_string()),
            playlist_name: Some("Friday set".to_string()),
            ..ChannelSettings::default()
        };
        assert!(validate_settings(&settings).is_ok());
    }
}
