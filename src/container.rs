//! Sport container assembly
//!
//! Runs every metric decoder of an activity over one shared window and
//! reconciles the results into a single [`Sample`] per second.

use crate::decoder::{time_offsets, DecodeMode, DecodedSeries, Metric, SeriesDecoder};
use crate::error::ConvertError;
use crate::schema::{RawActivityDetail, RawActivitySummary};
use crate::sport::SportCategory;
use crate::types::{Sample, SportContainer};
use crate::window::TimeWindow;
use tracing::debug;

/// Coordinates are transmitted as degrees scaled by this factor
pub const COORDINATE_SCALE: f64 = 1e8;

/// Builds a [`SportContainer`] from one summary/detail pair
pub struct SportContainerBuilder;

impl SportContainerBuilder {
    /// Decode every metric of the activity and merge them per second
    pub fn build(
        summary: &RawActivitySummary,
        detail: &RawActivityDetail,
    ) -> Result<SportContainer, ConvertError> {
        let category = SportCategory::from_code(summary.sport_type);
        let start = resolve_start(summary, detail)?;

        let offsets = time_offsets(detail.time.as_deref())?;
        let window = TimeWindow::resolve(summary.end_time, start, &offsets)?;
        let decoder = SeriesDecoder::new(window);

        let position = decoder.pair(detail.longitude_latitude.as_deref(), &offsets)?;
        let latitude = position.latitude.recorded();
        let longitude = position.longitude.recorded();
        let altitude = decoder
            .altitude(detail.altitude.as_deref(), &offsets)?
            .recorded();
        let heart_rate = decoder
            .scalar(
                Metric::HeartRate,
                detail.heart_rate.as_deref(),
                DecodeMode::Cumulative,
                0i64,
            )?
            .recorded();
        let speed = decoder
            .scalar(
                Metric::Speed,
                detail.speed.as_deref(),
                DecodeMode::Fixed,
                0.0f64,
            )?
            .recorded();
        let gait = decoder.gait(detail.gait.as_deref())?;
        let steps = gait.steps.recorded();
        let stride = gait.stride.recorded();
        let step_frequency = gait.frequency.recorded();

        debug!(
            track_id = start,
            %category,
            seconds = window.len(),
            time_entries = offsets.len(),
            has_position = latitude.is_some(),
            has_altitude = altitude.is_some(),
            has_heart_rate = heart_rate.is_some(),
            has_speed = speed.is_some(),
            has_gait = steps.is_some(),
            "decoded activity metrics"
        );

        let samples = window
            .seconds()
            .map(|timestamp| Sample {
                timestamp,
                latitude: at(&latitude, timestamp).map(|v| v as f64 / COORDINATE_SCALE),
                longitude: at(&longitude, timestamp).map(|v| v as f64 / COORDINATE_SCALE),
                altitude: at(&altitude, timestamp),
                heart_rate: at(&heart_rate, timestamp),
                speed: at(&speed, timestamp),
                steps: at(&steps, timestamp),
                stride: at(&stride, timestamp),
                step_frequency: at(&step_frequency, timestamp),
            })
            .collect();

        Ok(SportContainer {
            id: start.to_string(),
            sport_code: summary.sport_type,
            category,
            start: window.start_datetime()?,
            end: window.end_datetime()?,
            samples,
        })
    }
}

fn at<T: Copy>(series: &Option<DecodedSeries<T>>, timestamp: i64) -> Option<T> {
    series.as_ref().and_then(|s| s.get(timestamp))
}

/// The track id is the activity's start instant in epoch seconds
fn resolve_start(
    summary: &RawActivitySummary,
    detail: &RawActivityDetail,
) -> Result<i64, ConvertError> {
    match (summary.trackid, detail.trackid) {
        (Some(summary_id), Some(detail_id)) if summary_id != detail_id => {
            Err(ConvertError::TrackMismatch {
                summary: summary_id,
                detail: detail_id,
            })
        }
        (_, Some(id)) | (Some(id), None) => Ok(id),
        (None, None) => Err(ConvertError::MissingData("trackid".to_string())),
    }
}
