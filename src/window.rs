//! Activity time window
//!
//! The summary's declared end time sometimes understates how long the device
//! actually recorded, so the authoritative end is the later of the declared
//! end and the end implied by the time-delta metric.

use crate::decoder::time_offsets;
use crate::error::ConvertError;
use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Longest activity accepted, in seconds (one week). Anything longer comes
/// from a corrupt end time or offset, not from a recording.
pub const MAX_WINDOW_SECS: i64 = 7 * 24 * 60 * 60;

/// Inclusive range of epoch seconds shared by every metric of an activity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

impl TimeWindow {
    pub fn new(start: i64, end: i64) -> Self {
        Self { start, end }
    }

    /// Resolve the window from the declared end and already parsed time offsets
    pub fn resolve(
        declared_end: Option<i64>,
        start: i64,
        offsets: &[i64],
    ) -> Result<Self, ConvertError> {
        let declared_end =
            declared_end.ok_or_else(|| ConvertError::MissingData("end_time".to_string()))?;
        let recorded_end = offsets
            .iter()
            .try_fold(start, |reached, offset| {
                reached
                    .checked_add(*offset)
                    .ok_or_else(|| ConvertError::decode("time", &offset.to_string()))
            })?;

        if recorded_end > declared_end {
            debug!(
                start,
                declared_end,
                recorded_end,
                "recorded time exceeds declared end time"
            );
        }

        let end = declared_end.max(recorded_end);
        match end.checked_sub(start) {
            Some(span) if span <= MAX_WINDOW_SECS => Ok(Self { start, end }),
            _ => Err(ConvertError::ParseError(format!(
                "activity window too long: {start} to {end} exceeds {MAX_WINDOW_SECS} seconds"
            ))),
        }
    }

    /// Resolve the window straight from the encoded time-delta metric
    pub fn resolve_encoded(
        declared_end: Option<i64>,
        start: i64,
        time_deltas: Option<&str>,
    ) -> Result<Self, ConvertError> {
        let offsets = time_offsets(time_deltas)?;
        Self::resolve(declared_end, start, &offsets)
    }

    /// Number of seconds covered, both ends included
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end.saturating_sub(self.start).saturating_add(1) as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, timestamp: i64) -> bool {
        (self.start..=self.end).contains(&timestamp)
    }

    /// Every second of the window in order
    pub fn seconds(&self) -> impl Iterator<Item = i64> {
        self.start..=self.end
    }

    pub fn duration_secs(&self) -> i64 {
        self.end.saturating_sub(self.start).max(0)
    }

    pub fn start_datetime(&self) -> Result<DateTime<Utc>, ConvertError> {
        to_datetime(self.start)
    }

    pub fn end_datetime(&self) -> Result<DateTime<Utc>, ConvertError> {
        to_datetime(self.end)
    }
}

/// Convert epoch seconds to a UTC instant
pub fn to_datetime(timestamp: i64) -> Result<DateTime<Utc>, ConvertError> {
    Utc.timestamp_opt(timestamp, 0)
        .single()
        .ok_or_else(|| ConvertError::ParseError(format!("timestamp out of range: {timestamp}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declared_end_wins_when_later() {
        let window = TimeWindow::resolve(Some(1_100), 1_000, &[0, 10, 10]).unwrap();
        assert_eq!(window, TimeWindow::new(1_000, 1_100));
        assert_eq!(window.len(), 101);
        assert_eq!(window.duration_secs(), 100);
    }

    #[test]
    fn test_recorded_span_extends_declared_end() {
        let window = TimeWindow::resolve_encoded(Some(1_050), 1_000, Some("0;30;30;;10")).unwrap();
        assert_eq!(window.end, 1_070);
    }

    #[test]
    fn test_missing_declared_end() {
        let result = TimeWindow::resolve_encoded(None, 1_000, Some("0;1"));
        assert!(matches!(result, Err(ConvertError::MissingData(field)) if field == "end_time"));
    }

    #[test]
    fn test_malformed_time_segment() {
        let result = TimeWindow::resolve_encoded(Some(1_010), 1_000, Some("0;x;1"));
        assert!(matches!(
            result,
            Err(ConvertError::Decode { ref metric, ref segment }) if metric == "time" && segment == "x"
        ));
    }

    #[test]
    fn test_empty_time_metric_uses_declared_end() {
        let window = TimeWindow::resolve_encoded(Some(1_005), 1_000, None).unwrap();
        assert_eq!(window.seconds().collect::<Vec<_>>(), (1_000..=1_005).collect::<Vec<_>>());
        assert!(window.contains(1_005));
        assert!(!window.contains(1_006));
    }

    #[test]
    fn test_declared_end_in_milliseconds_is_rejected() {
        let result = TimeWindow::resolve(Some(1_698_572_716_000), 1_698_569_116, &[0, 1, 1]);
        assert!(matches!(
            result,
            Err(ConvertError::ParseError(ref message)) if message.contains("too long")
        ));
    }

    #[test]
    fn test_longest_accepted_window() {
        let window = TimeWindow::resolve(Some(MAX_WINDOW_SECS), 0, &[]).unwrap();
        assert_eq!(window.duration_secs(), MAX_WINDOW_SECS);
        assert!(TimeWindow::resolve(Some(MAX_WINDOW_SECS + 1), 0, &[]).is_err());
    }

    #[test]
    fn test_overflowing_time_offsets() {
        let result =
            TimeWindow::resolve_encoded(Some(1_010), 1_000, Some("0;9223372036854775807"));
        assert!(matches!(
            result,
            Err(ConvertError::Decode { ref metric, ref segment })
                if metric == "time" && segment == "9223372036854775807"
        ));
    }

    #[test]
    fn test_large_offsets_within_range_still_bounded() {
        let result = TimeWindow::resolve_encoded(
            Some(1_010),
            1_000,
            Some("0;4611686018427387903;4611686018427387903"),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_datetime_conversion() {
        let window = TimeWindow::new(1_698_569_116, 1_698_569_200);
        assert_eq!(window.start_datetime().unwrap().timestamp(), 1_698_569_116);
        assert_eq!(window.end_datetime().unwrap().timestamp(), 1_698_569_200);
    }
}
