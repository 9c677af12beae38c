//! Core types for the zepp-fit pipeline
//!
//! This module defines the data that flows through each stage: the
//! reconstructed per-second samples, the sport container holding them, and
//! the typed FIT messages handed to an output sink.

use crate::sport::SportCategory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One second of an activity, reconciled across every decoded metric
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Epoch seconds
    pub timestamp: i64,
    /// Latitude (degrees)
    pub latitude: Option<f64>,
    /// Longitude (degrees)
    pub longitude: Option<f64>,
    /// Altitude (centimeters)
    pub altitude: Option<i64>,
    /// Heart rate (bpm)
    pub heart_rate: Option<i64>,
    /// Instant speed (m/s)
    pub speed: Option<f64>,
    /// Steps since the start of the activity
    pub steps: Option<i64>,
    /// Stride (centimeters)
    pub stride: Option<i64>,
    /// Steps per minute
    pub step_frequency: Option<i64>,
}

/// A decoded activity: one sample per second of its resolved window.
///
/// Built once by [`crate::container::SportContainerBuilder`] and read-only
/// afterwards; `samples.len() == duration_secs() + 1`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SportContainer {
    pub(crate) id: String,
    pub(crate) sport_code: Option<i64>,
    pub(crate) category: SportCategory,
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
    pub(crate) samples: Vec<Sample>,
}

impl SportContainer {
    /// Activity identifier (the track id)
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn sport_code(&self) -> Option<i64> {
        self.sport_code
    }

    pub fn category(&self) -> SportCategory {
        self.category
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn end(&self) -> DateTime<Utc> {
        self.end
    }

    /// Elapsed seconds between the resolved start and end
    pub fn duration_secs(&self) -> i64 {
        (self.end - self.start).num_seconds()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn is_exportable(&self) -> bool {
        self.category.is_exportable()
    }

    /// Whether any sample carries a position
    pub fn has_position(&self) -> bool {
        self.samples
            .iter()
            .any(|s| s.latitude.is_some() && s.longitude.is_some())
    }
}

/// FIT file type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Activity,
}

/// FIT manufacturer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Manufacturer {
    Development,
}

impl Manufacturer {
    pub fn fit_value(&self) -> u16 {
        match self {
            Manufacturer::Development => 255,
        }
    }
}

/// FIT device index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceIndex {
    Creator,
}

/// FIT activity type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Manual,
}

/// FIT event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Timer,
    Lap,
}

/// FIT event type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Start,
    StopAll,
}

/// FIT sport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sport {
    Generic,
    Running,
    Cycling,
    Swimming,
    Walking,
}

impl Sport {
    pub fn fit_value(&self) -> u8 {
        match self {
            Sport::Generic => 0,
            Sport::Running => 1,
            Sport::Cycling => 2,
            Sport::Swimming => 5,
            Sport::Walking => 11,
        }
    }
}

/// FIT swim stroke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwimStroke {
    Freestyle,
    Breaststroke,
    Mixed,
    Invalid,
}

impl SwimStroke {
    /// Map a device swim-style code
    pub fn from_device_code(code: i64) -> Self {
        match code {
            1 => SwimStroke::Breaststroke,
            2 => SwimStroke::Freestyle,
            4 => SwimStroke::Mixed,
            _ => SwimStroke::Invalid,
        }
    }

    pub fn fit_value(&self) -> u8 {
        match self {
            SwimStroke::Freestyle => 0,
            SwimStroke::Breaststroke => 2,
            SwimStroke::Mixed => 5,
            SwimStroke::Invalid => 255,
        }
    }
}

/// FIT display measure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMeasure {
    Metric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIdMessage {
    pub file_type: FileType,
    pub manufacturer: Manufacturer,
    pub product: u16,
    pub serial_number: u32,
    pub time_created: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceInfoMessage {
    pub timestamp: DateTime<Utc>,
    pub device_index: DeviceIndex,
    pub manufacturer: Manufacturer,
    pub product: u16,
    pub product_name: String,
    pub serial_number: u32,
    pub software_version: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMessage {
    pub timestamp: DateTime<Utc>,
    pub local_timestamp: DateTime<Utc>,
    /// Seconds
    pub total_timer_time: f64,
    pub num_sessions: u16,
    pub activity_type: ActivityType,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMessage {
    pub timestamp: DateTime<Utc>,
    pub event: EventKind,
    pub event_type: EventType,
}

/// Per-second data point
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordMessage {
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u8>,
    /// m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Semicircles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_lat: Option<i32>,
    /// Semicircles
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_long: Option<i32>,
    /// Cycles per minute (one cycle = two steps)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cadence: Option<i16>,
    /// Millimeters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_length: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapMessage {
    pub message_index: u16,
    pub timestamp: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub event: EventKind,
    pub total_elapsed_time: f64,
    pub total_timer_time: f64,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ascent: Option<u16>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_descent: Option<u16>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMessage {
    pub message_index: u16,
    pub timestamp: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub total_elapsed_time: f64,
    pub total_timer_time: f64,
    pub first_lap_index: u16,
    pub num_laps: u16,
    pub sport: Sport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_distance: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_calories: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_ascent: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_descent: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_heart_rate: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_heart_rate: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_heart_rate: Option<u8>,
    /// Millimeters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_step_length: Option<f64>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_length_unit: Option<DisplayMeasure>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_active_lengths: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_strokes: Option<u32>,
    /// Meters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avg_stroke_distance: Option<f64>,
    /// m/s
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enhanced_max_speed: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub swim_stroke: Option<SwimStroke>,
}

/// One typed message of a FIT activity file, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "message", rename_all = "snake_case")]
pub enum FitMessage {
    FileId(FileIdMessage),
    DeviceInfo(DeviceInfoMessage),
    Activity(ActivityMessage),
    Event(EventMessage),
    Record(RecordMessage),
    Lap(LapMessage),
    Session(SessionMessage),
}

impl FitMessage {
    /// Message name as used by the FIT profile
    pub fn name(&self) -> &'static str {
        match self {
            FitMessage::FileId(_) => "file_id",
            FitMessage::DeviceInfo(_) => "device_info",
            FitMessage::Activity(_) => "activity",
            FitMessage::Event(_) => "event",
            FitMessage::Record(_) => "record",
            FitMessage::Lap(_) => "lap",
            FitMessage::Session(_) => "session",
        }
    }
}
