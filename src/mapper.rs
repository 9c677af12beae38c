//! Export mapping
//!
//! Turns a decoded [`SportContainer`] and its summary into the ordered
//! message list of a single-lap, single-session FIT activity file.

use crate::config::DeviceIdentity;
use crate::decoder::ALTITUDE_SENTINEL;
use crate::error::ConvertError;
use crate::schema::RawActivitySummary;
use crate::sport::{ExportBranch, SportCategory};
use crate::types::{
    ActivityMessage, ActivityType, DeviceIndex, DeviceInfoMessage, DisplayMeasure, EventKind,
    EventMessage, EventType, FileIdMessage, FileType, FitMessage, LapMessage, RecordMessage,
    Sample, SessionMessage, SportContainer, SwimStroke,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Semicircles in half a turn
const SEMICIRCLES_PER_180: f64 = 2_147_483_648.0;

/// Result of mapping one container
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", content = "value", rename_all = "snake_case")]
pub enum ExportOutcome {
    /// Ordered messages ready for an output sink
    Messages(Vec<FitMessage>),
    /// The category has no export branch; nothing was produced
    Unsupported(SportCategory),
}

impl ExportOutcome {
    pub fn messages(&self) -> Option<&[FitMessage]> {
        match self {
            ExportOutcome::Messages(messages) => Some(messages),
            ExportOutcome::Unsupported(_) => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, ExportOutcome::Unsupported(_))
    }
}

/// Convert degrees to FIT semicircles
pub fn degrees_to_semicircles(degrees: f64) -> i32 {
    (degrees * SEMICIRCLES_PER_180 / 180.0) as i32
}

/// Maps containers to FIT messages for one device identity
pub struct ExportMapper<'a> {
    device: &'a DeviceIdentity,
}

impl<'a> ExportMapper<'a> {
    pub fn new(device: &'a DeviceIdentity) -> Self {
        Self { device }
    }

    /// Map a container and its summary. Never fails for an unsupported
    /// category; the outcome says so instead.
    pub fn map(
        &self,
        container: &SportContainer,
        summary: &RawActivitySummary,
    ) -> Result<ExportOutcome, ConvertError> {
        let Some(branch) = container.category().branch() else {
            return Ok(ExportOutcome::Unsupported(container.category()));
        };

        let start = container.start();
        let end = container.end();
        let elapsed = container.duration_secs() as f64;

        let mut messages = Vec::with_capacity(container.samples().len() + 7);
        messages.push(FitMessage::FileId(self.file_id(start)));
        messages.push(FitMessage::DeviceInfo(self.device_info(start)));
        messages.push(FitMessage::Activity(ActivityMessage {
            timestamp: start,
            local_timestamp: start,
            total_timer_time: elapsed,
            num_sessions: 1,
            activity_type: ActivityType::Manual,
        }));
        messages.push(FitMessage::Event(EventMessage {
            timestamp: start,
            event: EventKind::Timer,
            event_type: EventType::Start,
        }));

        if branch == ExportBranch::OutdoorWithPosition {
            let gait = container.category().gait_supported();
            for sample in container.samples() {
                messages.push(FitMessage::Record(record(sample, gait)?));
            }
        }

        messages.push(FitMessage::Lap(lap(start, elapsed, summary)));
        messages.push(FitMessage::Session(session(
            container.category(),
            start,
            elapsed,
            summary,
        )));
        messages.push(FitMessage::Event(EventMessage {
            timestamp: end,
            event: EventKind::Timer,
            event_type: EventType::StopAll,
        }));

        Ok(ExportOutcome::Messages(messages))
    }

    fn file_id(&self, start: DateTime<Utc>) -> FileIdMessage {
        FileIdMessage {
            file_type: FileType::Activity,
            manufacturer: self.device.manufacturer,
            product: self.device.product,
            serial_number: self.device.serial_number,
            time_created: start,
        }
    }

    fn device_info(&self, start: DateTime<Utc>) -> DeviceInfoMessage {
        DeviceInfoMessage {
            timestamp: start,
            device_index: DeviceIndex::Creator,
            manufacturer: self.device.manufacturer,
            product: self.device.product,
            product_name: self.device.product_name.clone(),
            serial_number: self.device.serial_number,
            software_version: self.device.software_version,
        }
    }
}

fn record(sample: &Sample, gait: bool) -> Result<RecordMessage, ConvertError> {
    let (cadence, step_length) = if gait {
        (
            sample.step_frequency.map(|f| saturate_i16(f / 2)),
            sample.stride.map(|cm| cm as f64 * 10.0),
        )
    } else {
        (None, None)
    };

    Ok(RecordMessage {
        timestamp: crate::window::to_datetime(sample.timestamp)?,
        heart_rate: sample.heart_rate.map(saturate_u8),
        speed: sample.speed,
        altitude: sample
            .altitude
            .filter(|cm| *cm != ALTITUDE_SENTINEL)
            // Keeps centimeter precision instead of whole meters
            .map(|cm| cm as f64 / 100.0),
        position_lat: sample.latitude.map(degrees_to_semicircles),
        position_long: sample.longitude.map(degrees_to_semicircles),
        cadence,
        step_length,
    })
}

fn lap(start: DateTime<Utc>, elapsed: f64, summary: &RawActivitySummary) -> LapMessage {
    LapMessage {
        message_index: 0,
        timestamp: start,
        start_time: start,
        event: EventKind::Lap,
        total_elapsed_time: elapsed,
        total_timer_time: elapsed,
        total_distance: summary.dis,
        total_ascent: positive(summary.altitude_ascend).map(|v| v as u16),
        total_descent: positive(summary.altitude_descend).map(|v| v as u16),
    }
}

fn session(
    category: SportCategory,
    start: DateTime<Utc>,
    elapsed: f64,
    summary: &RawActivitySummary,
) -> SessionMessage {
    let mut session = SessionMessage {
        message_index: 0,
        timestamp: start,
        start_time: start,
        total_elapsed_time: elapsed,
        total_timer_time: elapsed,
        first_lap_index: 0,
        num_laps: 1,
        sport: category.fit_sport(),
        total_distance: summary.dis,
        total_calories: summary.calorie.map(|v| v as u32),
        total_ascent: positive(summary.altitude_ascend).map(|v| v as u16),
        total_descent: positive(summary.altitude_descend).map(|v| v as u16),
        avg_heart_rate: positive(summary.avg_heart_rate).map(|v| v as u8),
        min_heart_rate: positive(summary.min_heart_rate).map(|v| v as u8),
        max_heart_rate: positive(summary.max_heart_rate).map(|v| v as u8),
        avg_step_length: positive(summary.avg_stride_length).map(|cm| cm * 10.0),
        pool_length: None,
        pool_length_unit: None,
        num_active_lengths: None,
        total_strokes: None,
        avg_stroke_distance: None,
        enhanced_max_speed: None,
        swim_stroke: None,
    };

    if category.branch() == Some(ExportBranch::PoolBased) {
        if let Some(length) = positive(summary.swim_pool_length) {
            session.pool_length = Some(length);
            session.pool_length_unit = Some(DisplayMeasure::Metric);
        }
        session.num_active_lengths = positive(summary.total_trips).map(|v| v as u16);
        session.total_strokes = positive(summary.total_strokes).map(|v| v as u32);
        // Device reports centimeters
        session.avg_stroke_distance = positive(summary.avg_distance_per_stroke).map(|v| v / 100.0);
        session.enhanced_max_speed = positive(summary.max_stroke_speed);
        session.swim_stroke = summary
            .swim_style
            .filter(|code| *code > 0)
            .map(SwimStroke::from_device_code);
    }

    session
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

fn saturate_u8(value: i64) -> u8 {
    value.clamp(0, u8::MAX as i64) as u8
}

fn saturate_i16(value: i64) -> i16 {
    value.clamp(i16::MIN as i64, i16::MAX as i64) as i16
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::SportContainerBuilder;
    use crate::schema::RawActivityDetail;
    use pretty_assertions::assert_eq;

    fn build(sport: i64, detail: RawActivityDetail) -> (SportContainer, RawActivitySummary) {
        let summary = RawActivitySummary {
            trackid: Some(1_000),
            sport_type: Some(sport),
            end_time: Some(1_003),
            dis: Some(1_250.0),
            calorie: Some(88.7),
            altitude_ascend: Some(12.0),
            altitude_descend: Some(0.0),
            avg_heart_rate: Some(131.0),
            min_heart_rate: Some(0.0),
            max_heart_rate: Some(160.0),
            avg_stride_length: Some(71.0),
            swim_pool_length: Some(25.0),
            total_trips: Some(40.0),
            total_strokes: Some(620.0),
            avg_distance_per_stroke: Some(161.0),
            max_stroke_speed: Some(1.4),
            swim_style: Some(2),
            ..Default::default()
        };
        let detail = RawActivityDetail {
            trackid: Some(1_000),
            ..detail
        };
        let container = SportContainerBuilder::build(&summary, &detail).unwrap();
        (container, summary)
    }

    fn outdoor_detail() -> RawActivityDetail {
        RawActivityDetail {
            time: Some("0;1;1;1".to_string()),
            longitude_latitude: Some("4500000000,500000000;0,0;0,0;0,0".to_string()),
            altitude: Some("-2000000;1250;1250;1300".to_string()),
            heart_rate: Some("3,120".to_string()),
            speed: Some("3,2.75".to_string()),
            gait: Some("3,4,75,163".to_string()),
            ..Default::default()
        }
    }

    fn map(container: &SportContainer, summary: &RawActivitySummary) -> Vec<FitMessage> {
        let device = DeviceIdentity::default();
        ExportMapper::new(&device)
            .map(container, summary)
            .unwrap()
            .messages()
            .unwrap()
            .to_vec()
    }

    #[test]
    fn test_outdoor_message_order() {
        let (container, summary) = build(1, outdoor_detail());
        let messages = map(&container, &summary);

        let names: Vec<&str> = messages.iter().map(FitMessage::name).collect();
        assert_eq!(
            names,
            vec![
                "file_id",
                "device_info",
                "activity",
                "event",
                "record",
                "record",
                "record",
                "record",
                "lap",
                "session",
                "event"
            ]
        );

        match (&messages[3], &messages[10]) {
            (FitMessage::Event(start), FitMessage::Event(stop)) => {
                assert_eq!(start.event_type, EventType::Start);
                assert_eq!(start.timestamp.timestamp(), 1_000);
                assert_eq!(stop.event_type, EventType::StopAll);
                assert_eq!(stop.timestamp.timestamp(), 1_003);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[test]
    fn test_running_records() {
        let (container, summary) = build(1, outdoor_detail());
        let messages = map(&container, &summary);

        let FitMessage::Record(record) = &messages[4] else {
            panic!("expected record");
        };
        assert_eq!(record.heart_rate, Some(120));
        assert_eq!(record.speed, Some(2.75));
        assert_eq!(record.altitude, Some(12.5));
        assert_eq!(record.position_lat, Some(536_870_912));
        assert_eq!(record.position_long, Some(59_652_323));
        assert_eq!(record.cadence, Some(81));
        assert_eq!(record.step_length, Some(750.0));

        let FitMessage::Record(last) = &messages[7] else {
            panic!("expected record");
        };
        assert_eq!(last.altitude, Some(13.0));
    }

    #[test]
    fn test_cycling_records_have_no_gait() {
        let (container, summary) = build(9, outdoor_detail());
        let messages = map(&container, &summary);

        for message in &messages {
            if let FitMessage::Record(record) = message {
                assert_eq!(record.cadence, None);
                assert_eq!(record.step_length, None);
                assert!(record.heart_rate.is_some());
            }
        }
    }

    #[test]
    fn test_lap_and_session_conditional_fields() {
        let (container, summary) = build(6, outdoor_detail());
        let messages = map(&container, &summary);

        let FitMessage::Lap(lap) = &messages[8] else {
            panic!("expected lap");
        };
        assert_eq!(lap.total_elapsed_time, 3.0);
        assert_eq!(lap.total_distance, Some(1_250.0));
        assert_eq!(lap.total_ascent, Some(12));
        assert_eq!(lap.total_descent, None);

        let FitMessage::Session(session) = &messages[9] else {
            panic!("expected session");
        };
        assert_eq!(session.sport, crate::types::Sport::Walking);
        assert_eq!(session.num_laps, 1);
        assert_eq!(session.total_calories, Some(88));
        assert_eq!(session.avg_heart_rate, Some(131));
        assert_eq!(session.min_heart_rate, None);
        assert_eq!(session.max_heart_rate, Some(160));
        assert_eq!(session.avg_step_length, Some(710.0));
        assert_eq!(session.pool_length, None);
        assert_eq!(session.swim_stroke, None);
    }

    #[test]
    fn test_indoor_swimming_is_pool_based() {
        let (container, summary) = build(14, RawActivityDetail::default());
        let messages = map(&container, &summary);

        assert!(messages
            .iter()
            .all(|m| !matches!(m, FitMessage::Record(_))));
        assert_eq!(messages.len(), 7);

        let FitMessage::Session(session) = &messages[5] else {
            panic!("expected session");
        };
        assert_eq!(session.sport, crate::types::Sport::Swimming);
        assert_eq!(session.pool_length, Some(25.0));
        assert_eq!(session.pool_length_unit, Some(DisplayMeasure::Metric));
        assert_eq!(session.num_active_lengths, Some(40));
        assert_eq!(session.total_strokes, Some(620));
        assert_eq!(session.avg_stroke_distance, Some(1.61));
        assert_eq!(session.enhanced_max_speed, Some(1.4));
        assert_eq!(session.swim_stroke, Some(SwimStroke::Freestyle));
    }

    #[test]
    fn test_unsupported_category_yields_no_messages() {
        let (container, summary) = build(21, outdoor_detail());
        let device = DeviceIdentity::default();
        let outcome = ExportMapper::new(&device).map(&container, &summary).unwrap();

        assert_eq!(
            outcome,
            ExportOutcome::Unsupported(SportCategory::Unsupported(Some(21)))
        );
        assert!(outcome.messages().is_none());
    }

    #[test]
    fn test_device_identity_is_stamped() {
        let (container, summary) = build(1, outdoor_detail());
        let device = DeviceIdentity {
            serial_number: 7,
            product_name: "bench".to_string(),
            ..Default::default()
        };
        let outcome = ExportMapper::new(&device).map(&container, &summary).unwrap();
        let messages = outcome.messages().unwrap();

        let FitMessage::FileId(file_id) = &messages[0] else {
            panic!("expected file id");
        };
        assert_eq!(file_id.serial_number, 7);
        assert_eq!(file_id.time_created.timestamp(), 1_000);

        let FitMessage::DeviceInfo(info) = &messages[1] else {
            panic!("expected device info");
        };
        assert_eq!(info.product_name, "bench");
        assert_eq!(info.software_version, 1.0);
    }

    #[test]
    fn test_sentinel_altitude_is_omitted() {
        let detail = RawActivityDetail {
            time: Some("0;1;1;1".to_string()),
            altitude: Some("900;-2000000".to_string()),
            ..Default::default()
        };
        let (container, summary) = build(1, detail);
        let messages = map(&container, &summary);

        let altitudes: Vec<Option<f64>> = messages
            .iter()
            .filter_map(|m| match m {
                FitMessage::Record(r) => Some(r.altitude),
                _ => None,
            })
            .collect();
        assert_eq!(altitudes, vec![Some(9.0), None, None, None]);
    }

    #[test]
    fn test_cadence_truncates_and_saturates() {
        assert_eq!(saturate_i16(163 / 2), 81);
        assert_eq!(saturate_i16(i64::MAX / 2), i16::MAX);
        assert_eq!(saturate_u8(300), 255);
        assert_eq!(degrees_to_semicircles(180.0), i32::MAX);
        assert_eq!(degrees_to_semicircles(-90.0), -1_073_741_824);
    }
}
