//! Small shared helpers for timestamps, numeric bounds and panic payloads.

use chrono::{DateTime, Utc};
use std::any::Any;

/// Represents a timestamp that can be serialized/deserialized.
pub type Timestamp = DateTime<Utc>;

/// Returns the current UTC timestamp.
#[must_use]
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Returns the current UTC time as an RFC 3339 string with microseconds.
#[must_use]
pub fn iso_timestamp() -> String {
    Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f+00:00").to_string()
}

/// Milliseconds elapsed between two timestamps, never negative.
#[must_use]
pub fn duration_ms(started_at: Timestamp, ended_at: Timestamp) -> f64 {
    let micros = (ended_at - started_at).num_microseconds().unwrap_or(0).max(0);
    micros as f64 / 1000.0
}

/// Clamps a value into `[0.0, 1.0]`. NaN becomes `0.0`.
#[must_use]
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Renders a panic payload as text.
///
/// `panic!` with a literal produces `&'static str`, with format arguments a
/// `String`; anything else is reported generically.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "stage panicked with a non-string payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_unit() {
        assert_eq!(clamp_unit(-0.5), 0.0);
        assert_eq!(clamp_unit(0.42), 0.42);
        assert_eq!(clamp_unit(7.0), 1.0);
        assert_eq!(clamp_unit(f64::NAN), 0.0);
        assert_eq!(clamp_unit(f64::INFINITY), 1.0);
    }

    #[test]
    fn test_duration_ms_never_negative() {
        let later = now_utc();
        let earlier = later - chrono::Duration::milliseconds(5);
        assert_eq!(duration_ms(later, earlier), 0.0);
        assert!((duration_ms(earlier, later) - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_panic_message_variants() {
        let literal: Box<dyn Any + Send> = Box::new("literal");
        let owned: Box<dyn Any + Send> = Box::new(format!("owned {}", 1));
        let other: Box<dyn Any + Send> = Box::new(17_u32);

        assert_eq!(panic_message(literal.as_ref()), "literal");
        assert_eq!(panic_message(owned.as_ref()), "owned 1");
        assert!(panic_message(other.as_ref()).contains("non-string"));
    }

    #[test]
    fn test_iso_timestamp_format() {
        let ts = iso_timestamp();
        assert!(ts.contains('T'));
        assert!(ts.ends_with("+00:00"));
    }
}
