//! Raw Zepp sport export records
//!
//! The history and detail endpoints return loosely typed JSON: numeric
//! statistics show up either as JSON numbers or as numeric strings, and most
//! fields are simply missing on activities that do not record them. Every
//! field is therefore optional, and a value that is present but not numeric
//! is treated as absent rather than as zero.

use serde::{Deserialize, Deserializer, Serialize};

/// Loosely typed numeric value as found in export payloads
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawNumber {
    Integer(i64),
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

impl RawNumber {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            RawNumber::Integer(i) => Some(*i as f64),
            RawNumber::Number(n) if n.is_finite() => Some(*n),
            RawNumber::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            RawNumber::Integer(i) => Some(*i),
            RawNumber::Number(_) => self.as_f64().map(|n| n as i64),
            RawNumber::Text(s) => {
                let trimmed = s.trim();
                trimmed
                    .parse::<i64>()
                    .ok()
                    .or_else(|| self.as_f64().map(|n| n as i64))
            }
            RawNumber::Other(_) => None,
        }
    }
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawNumber> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.as_f64()))
}

fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawNumber> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(|value| value.as_i64()))
}

/// Aggregate statistics of one activity, as listed by the history endpoint.
///
/// Units are device-native: distance in meters, stride in centimeters,
/// pool length in meters, stroke distance in centimeters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawActivitySummary {
    /// Track identifier (activity start, epoch seconds)
    #[serde(default, deserialize_with = "lenient_i64")]
    pub trackid: Option<i64>,
    /// Source tag required to fetch the matching detail
    #[serde(default)]
    pub source: Option<String>,
    /// Device sport-type code
    #[serde(rename = "type", default, deserialize_with = "lenient_i64")]
    pub sport_type: Option<i64>,
    /// Declared end of the activity (epoch seconds)
    #[serde(default, deserialize_with = "lenient_i64")]
    pub end_time: Option<i64>,
    /// Moving time reported by the device (seconds)
    #[serde(default, deserialize_with = "lenient_i64")]
    pub run_time: Option<i64>,
    /// Total distance (meters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub dis: Option<f64>,
    /// Total calories (kcal)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub calorie: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_pace: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_frequency: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_heart_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub min_heart_rate: Option<f64>,
    /// Total ascent (meters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude_ascend: Option<f64>,
    /// Total descent (meters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude_descend: Option<f64>,
    #[serde(default, deserialize_with = "lenient_i64")]
    pub total_step: Option<i64>,
    /// Average stride (centimeters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_stride_length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_frequency: Option<f64>,
    /// Pool length (meters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub swim_pool_length: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_strokes: Option<f64>,
    /// Number of pool lengths swum
    #[serde(default, deserialize_with = "lenient_f64")]
    pub total_trips: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_stroke_speed: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub max_stroke_speed: Option<f64>,
    /// Average distance per stroke (centimeters)
    #[serde(default, deserialize_with = "lenient_f64")]
    pub avg_distance_per_stroke: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub swolf: Option<f64>,
    /// Device swim-stroke code
    #[serde(default, deserialize_with = "lenient_i64")]
    pub swim_style: Option<i64>,
}

/// Encoded per-metric series of one activity, as returned by the detail endpoint.
///
/// Every metric is a `;`-separated list of entries:
/// - `time`: `offset` (seconds since the previous point)
/// - `longitude_latitude`: `dlat,dlon` (deltas scaled by 1e8, aligned with `time`)
/// - `altitude`: `centimeters` (aligned with `time`, `-2000000` when unknown)
/// - `heart_rate`: `offset,delta` (empty offset means one second)
/// - `speed`: `offset,meters_per_second`
/// - `gait`: `offset,step_delta,stride_cm,step_frequency`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawActivityDetail {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub trackid: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub longitude_latitude: Option<String>,
    #[serde(default)]
    pub altitude: Option<String>,
    #[serde(default)]
    pub heart_rate: Option<String>,
    #[serde(default)]
    pub speed: Option<String>,
    #[serde(default)]
    pub gait: Option<String>,
}

/// Envelope wrapping every web response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportResponse<T> {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: Option<String>,
    pub data: T,
}

/// One page of the activity history
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SummaryPage {
    /// Track id to continue from, or [`LAST_PAGE_MARKER`]
    #[serde(default = "last_page")]
    pub next: i64,
    #[serde(default)]
    pub summary: Vec<RawActivitySummary>,
}

/// Value of [`SummaryPage::next`] on the final page
pub const LAST_PAGE_MARKER: i64 = -1;

fn last_page() -> i64 {
    LAST_PAGE_MARKER
}

impl SummaryPage {
    /// Cursor for the following page, if any
    pub fn next_cursor(&self) -> Option<i64> {
        (self.next != LAST_PAGE_MARKER).then_some(self.next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_summary_with_string_numbers() {
        let json = r#"{
            "trackid": "1698569116",
            "source": "run.mifit.huami.com",
            "type": 1,
            "end_time": "1698572716",
            "dis": "10012.5",
            "calorie": "712",
            "avg_heart_rate": "151.3",
            "max_heart_rate": 178,
            "min_heart_rate": 0,
            "altitude_ascend": 85,
            "avg_stride_length": 112
        }"#;

        let summary: RawActivitySummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.trackid, Some(1_698_569_116));
        assert_eq!(summary.sport_type, Some(1));
        assert_eq!(summary.end_time, Some(1_698_572_716));
        assert_eq!(summary.dis, Some(10012.5));
        assert_eq!(summary.calorie, Some(712.0));
        assert_eq!(summary.avg_heart_rate, Some(151.3));
        assert_eq!(summary.max_heart_rate, Some(178.0));
        assert_eq!(summary.min_heart_rate, Some(0.0));
        assert_eq!(summary.altitude_descend, None);
    }

    #[test]
    fn test_non_numeric_values_are_absent() {
        let json = r#"{"dis": "", "calorie": "n/a", "end_time": null, "swim_style": true}"#;

        let summary: RawActivitySummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.dis, None);
        assert_eq!(summary.calorie, None);
        assert_eq!(summary.end_time, None);
        assert_eq!(summary.swim_style, None);
    }

    #[test]
    fn test_deserialize_detail_envelope() {
        let json = r#"{
            "code": 1,
            "message": "success",
            "data": {
                "trackid": 1698569116,
                "time": "0;1;1;",
                "heart_rate": "0,80;1,2;,-1",
                "unknown_field": "ignored"
            }
        }"#;

        let response: ExportResponse<RawActivityDetail> = serde_json::from_str(json).unwrap();
        assert_eq!(response.code, 1);
        assert_eq!(response.data.trackid, Some(1_698_569_116));
        assert_eq!(response.data.time.as_deref(), Some("0;1;1;"));
        assert!(response.data.gait.is_none());
    }

    #[test]
    fn test_summary_page_cursor() {
        let page: SummaryPage =
            serde_json::from_str(r#"{"next": 1698000000, "summary": []}"#).unwrap();
        assert_eq!(page.next_cursor(), Some(1_698_000_000));

        let last: SummaryPage = serde_json::from_str(r#"{"next": -1, "summary": []}"#).unwrap();
        assert_eq!(last.next_cursor(), None);

        let missing: SummaryPage = serde_json::from_str(r#"{"summary": []}"#).unwrap();
        assert_eq!(missing.next_cursor(), None);
    }
}
