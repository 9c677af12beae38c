//! Delta-series decoding
//!
//! Every detail metric is a `;`-separated list of sparse entries. Each entry
//! moves a cursor forward by a number of seconds and carries a payload; the
//! decoder turns that into one value per second of the activity window.
//!
//! Two reconstruction modes exist:
//! - [`DecodeMode::Cumulative`]: payloads are deltas added to a running total
//! - [`DecodeMode::Fixed`]: payloads replace the previous value
//!
//! Four entry shapes use them: `offset,value` scalars, payload-only entries
//! aligned with the time metric, `dlat,dlon` coordinate pairs and
//! `offset,steps,stride,frequency` gait tuples. All of them go through the
//! same [`Timeline`], so every decoded series covers exactly `[start, end]`.

use crate::error::ConvertError;
use crate::window::{TimeWindow, MAX_WINDOW_SECS};
use serde::Serialize;
use std::str::FromStr;

/// Altitude reported when the device had no reading (centimeters)
pub const ALTITUDE_SENTINEL: i64 = -2_000_000;

/// How an entry payload updates the running value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    Cumulative,
    Fixed,
}

/// Encoded metrics of an activity detail
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Time,
    Position,
    Altitude,
    HeartRate,
    Speed,
    Gait,
}

impl Metric {
    /// Field name in the detail payload
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Time => "time",
            Metric::Position => "longitude_latitude",
            Metric::Altitude => "altitude",
            Metric::HeartRate => "heart_rate",
            Metric::Speed => "speed",
            Metric::Gait => "gait",
        }
    }

    /// Offset used when the offset field of an entry is empty
    fn empty_offset(&self) -> Option<i64> {
        match self {
            // The device omits the offset when it is exactly one second
            Metric::HeartRate => Some(1),
            _ => None,
        }
    }
}

/// Numeric payload a series can be decoded into
pub trait DeltaValue: Copy + FromStr {
    /// Running total after adding `delta`
    fn accumulate(self, delta: Self) -> Self;
}

impl DeltaValue for i64 {
    fn accumulate(self, delta: Self) -> Self {
        self.saturating_add(delta)
    }
}

impl DeltaValue for f64 {
    fn accumulate(self, delta: Self) -> Self {
        self + delta
    }
}

/// Dense series holding one value per second of a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodedSeries<T> {
    start: i64,
    values: Vec<T>,
    entries: usize,
}

impl<T: Copy> DecodedSeries<T> {
    /// First second covered
    pub fn start(&self) -> i64 {
        self.start
    }

    /// Last second covered
    pub fn end(&self) -> i64 {
        self.start + self.values.len() as i64 - 1
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of encoded entries the series was built from
    pub fn entry_count(&self) -> usize {
        self.entries
    }

    /// Whether the metric had any entry at all
    pub fn has_entries(&self) -> bool {
        self.entries > 0
    }

    /// Value at an absolute second
    pub fn get(&self, timestamp: i64) -> Option<T> {
        if timestamp < self.start {
            return None;
        }
        self.values.get((timestamp - self.start) as usize).copied()
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// `(timestamp, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (i64, T)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(move |(i, v)| (self.start + i as i64, *v))
    }

    /// The series itself, or `None` when the metric was not recorded
    pub fn recorded(self) -> Option<Self> {
        self.has_entries().then_some(self)
    }
}

/// Latitude and longitude running sums (degrees scaled by 1e8)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PairSeries {
    pub latitude: DecodedSeries<i64>,
    pub longitude: DecodedSeries<i64>,
}

/// Aligned series decoded from gait tuples
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaitSeries {
    /// Cumulative step count
    pub steps: DecodedSeries<i64>,
    /// Stride (centimeters)
    pub stride: DecodedSeries<i64>,
    /// Steps per minute
    pub frequency: DecodedSeries<i64>,
}

/// Per-second fill engine shared by every entry shape.
///
/// The first entry fills `[start, start + offset]`, each following entry
/// fills `(reached, reached + offset]`. Seconds past `end` are never
/// written, and whatever is left unfilled holds the current value.
struct Timeline<T> {
    start: i64,
    end: i64,
    reached: i64,
    current: T,
    values: Vec<T>,
    entries: usize,
}

impl<T: DeltaValue> Timeline<T> {
    fn new(window: TimeWindow, initial: T) -> Self {
        Self {
            start: window.start,
            end: window.end,
            reached: window.start,
            current: initial,
            values: Vec::with_capacity(window.len().min(MAX_WINDOW_SECS as usize + 1)),
            entries: 0,
        }
    }

    fn next_second(&self) -> i64 {
        self.start + self.values.len() as i64
    }

    fn apply(&mut self, mode: DecodeMode, offset: i64, payload: T) {
        self.current = match mode {
            DecodeMode::Cumulative => self.current.accumulate(payload),
            DecodeMode::Fixed => payload,
        };

        let target = if self.entries == 0 {
            self.start.saturating_add(offset)
        } else {
            self.reached.saturating_add(offset)
        };

        let last = target.min(self.end);
        while self.next_second() <= last {
            self.values.push(self.current);
        }

        self.reached = target;
        self.entries += 1;
    }

    fn finish(mut self) -> DecodedSeries<T> {
        while self.next_second() <= self.end {
            self.values.push(self.current);
        }
        DecodedSeries {
            start: self.start,
            values: self.values,
            entries: self.entries,
        }
    }
}

/// Decoder bound to the resolved window of one activity
#[derive(Debug, Clone, Copy)]
pub struct SeriesDecoder {
    window: TimeWindow,
}

impl SeriesDecoder {
    pub fn new(window: TimeWindow) -> Self {
        Self { window }
    }

    pub fn window(&self) -> TimeWindow {
        self.window
    }

    /// Decode `offset,value` entries
    pub fn scalar<T: DeltaValue>(
        &self,
        metric: Metric,
        encoded: Option<&str>,
        mode: DecodeMode,
        initial: T,
    ) -> Result<DecodedSeries<T>, ConvertError> {
        let mut timeline = Timeline::new(self.window, initial);
        for segment in segments(encoded) {
            let [offset, value] = fields::<2>(metric, segment)?;
            timeline.apply(
                mode,
                parse_offset(metric, offset, segment)?,
                parse_value(metric, value, segment)?,
            );
        }
        Ok(timeline.finish())
    }

    /// Decode payload-only entries whose offsets come from the time metric
    pub fn aligned<T: DeltaValue>(
        &self,
        metric: Metric,
        encoded: Option<&str>,
        offsets: &[i64],
        mode: DecodeMode,
        initial: T,
    ) -> Result<DecodedSeries<T>, ConvertError> {
        let payloads = segments(encoded)
            .map(|segment| {
                let [value] = fields::<1>(metric, segment)?;
                parse_value(metric, value, segment)
            })
            .collect::<Result<Vec<T>, _>>()?;
        Ok(self.aligned_values(&payloads, offsets, mode, initial))
    }

    fn aligned_values<T: DeltaValue>(
        &self,
        payloads: &[T],
        offsets: &[i64],
        mode: DecodeMode,
        initial: T,
    ) -> DecodedSeries<T> {
        let mut timeline = Timeline::new(self.window, initial);
        for (index, payload) in payloads.iter().enumerate() {
            timeline.apply(mode, aligned_offset(offsets, index), *payload);
        }
        timeline.finish()
    }

    /// Decode altitude in centimeters, replacing sentinel readings with the
    /// next real one
    pub fn altitude(
        &self,
        encoded: Option<&str>,
        offsets: &[i64],
    ) -> Result<DecodedSeries<i64>, ConvertError> {
        let metric = Metric::Altitude;
        let mut payloads = segments(encoded)
            .map(|segment| {
                let [value] = fields::<1>(metric, segment)?;
                parse_value::<i64>(metric, value, segment)
            })
            .collect::<Result<Vec<_>, _>>()?;
        backfill_sentinel(&mut payloads, ALTITUDE_SENTINEL);
        Ok(self.aligned_values(&payloads, offsets, DecodeMode::Fixed, 0))
    }

    /// Decode `dlat,dlon` pairs into two running sums on the time metric's offsets
    pub fn pair(&self, encoded: Option<&str>, offsets: &[i64]) -> Result<PairSeries, ConvertError> {
        let metric = Metric::Position;
        let mut latitude = Timeline::new(self.window, 0i64);
        let mut longitude = Timeline::new(self.window, 0i64);

        for (index, segment) in segments(encoded).enumerate() {
            let [lat, lon] = fields::<2>(metric, segment)?;
            let offset = aligned_offset(offsets, index);
            latitude.apply(
                DecodeMode::Cumulative,
                offset,
                parse_value(metric, lat, segment)?,
            );
            longitude.apply(
                DecodeMode::Cumulative,
                offset,
                parse_value(metric, lon, segment)?,
            );
        }

        Ok(PairSeries {
            latitude: latitude.finish(),
            longitude: longitude.finish(),
        })
    }

    /// Decode `offset,step_delta,stride,frequency` tuples in a single pass
    pub fn gait(&self, encoded: Option<&str>) -> Result<GaitSeries, ConvertError> {
        let metric = Metric::Gait;
        let mut steps = Timeline::new(self.window, 0i64);
        let mut stride = Timeline::new(self.window, 0i64);
        let mut frequency = Timeline::new(self.window, 0i64);

        for segment in segments(encoded) {
            let [offset, step_delta, stride_cm, step_frequency] = fields::<4>(metric, segment)?;
            let offset = parse_offset(metric, offset, segment)?;
            steps.apply(
                DecodeMode::Cumulative,
                offset,
                parse_value(metric, step_delta, segment)?,
            );
            stride.apply(
                DecodeMode::Fixed,
                offset,
                parse_value(metric, stride_cm, segment)?,
            );
            frequency.apply(
                DecodeMode::Fixed,
                offset,
                parse_value(metric, step_frequency, segment)?,
            );
        }

        Ok(GaitSeries {
            steps: steps.finish(),
            stride: stride.finish(),
            frequency: frequency.finish(),
        })
    }
}

/// Parse the time metric into per-entry offsets (seconds)
pub fn time_offsets(encoded: Option<&str>) -> Result<Vec<i64>, ConvertError> {
    let metric = Metric::Time;
    segments(encoded)
        .map(|segment| {
            let [offset] = fields::<1>(metric, segment)?;
            parse_offset(metric, offset, segment)
        })
        .collect()
}

/// Replace every sentinel with the first real value after it. Sentinels
/// with no real value after them are kept.
pub fn backfill_sentinel(values: &mut [i64], sentinel: i64) {
    let mut next_real = None;
    for value in values.iter_mut().rev() {
        if *value == sentinel {
            if let Some(real) = next_real {
                *value = real;
            }
        } else {
            next_real = Some(*value);
        }
    }
}

fn segments(encoded: Option<&str>) -> impl Iterator<Item = &str> {
    encoded
        .unwrap_or_default()
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}

fn fields<const N: usize>(metric: Metric, segment: &str) -> Result<[&str; N], ConvertError> {
    let parts: Vec<&str> = segment.split(',').map(str::trim).collect();
    parts
        .try_into()
        .map_err(|_| ConvertError::decode(metric.name(), segment))
}

fn parse_offset(metric: Metric, field: &str, segment: &str) -> Result<i64, ConvertError> {
    if field.is_empty() {
        return metric
            .empty_offset()
            .ok_or_else(|| ConvertError::decode(metric.name(), segment));
    }
    match field.parse::<i64>() {
        Ok(offset) if offset >= 0 => Ok(offset),
        _ => Err(ConvertError::decode(metric.name(), segment)),
    }
}

fn parse_value<T: FromStr>(metric: Metric, field: &str, segment: &str) -> Result<T, ConvertError> {
    field
        .parse::<T>()
        .map_err(|_| ConvertError::decode(metric.name(), segment))
}

/// Offset of the `index`-th entry of a time-aligned metric. Entries past the
/// end of the time metric are spaced one second apart.
fn aligned_offset(offsets: &[i64], index: usize) -> i64 {
    match offsets.get(index) {
        Some(offset) => *offset,
        None if index == 0 => 0,
        None => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn decoder(start: i64, end: i64) -> SeriesDecoder {
        SeriesDecoder::new(TimeWindow::new(start, end))
    }

    #[test]
    fn test_cumulative_heart_rate() {
        // 80 for [0, 2], +2 for (2, 4], -1 one second later, then held
        let series = decoder(100, 107)
            .scalar(Metric::HeartRate, Some("2,80;2,2;,-1"), DecodeMode::Cumulative, 0i64)
            .unwrap();

        assert_eq!(series.values(), &[80, 80, 80, 82, 82, 81, 81, 81]);
        assert_eq!(series.start(), 100);
        assert_eq!(series.end(), 107);
        assert_eq!(series.entry_count(), 3);
    }

    #[test]
    fn test_fixed_speed() {
        let series = decoder(0, 5)
            .scalar(Metric::Speed, Some("1,1.5;2,3.0;"), DecodeMode::Fixed, 0.0f64)
            .unwrap();

        assert_eq!(series.values(), &[1.5, 1.5, 3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_zero_offset_entry_updates_value_without_writing() {
        let series = decoder(0, 4)
            .scalar(Metric::HeartRate, Some("1,80;0,10;2,-6"), DecodeMode::Cumulative, 0i64)
            .unwrap();

        assert_eq!(series.values(), &[80, 80, 84, 84, 84]);
    }

    #[test]
    fn test_trailing_zero_offset_entry_is_held() {
        let series = decoder(0, 3)
            .scalar(Metric::Speed, Some("1,2.0;0,4.0"), DecodeMode::Fixed, 0.0f64)
            .unwrap();

        assert_eq!(series.values(), &[2.0, 2.0, 4.0, 4.0]);
    }

    #[test]
    fn test_empty_metric_holds_initial_value() {
        let series = decoder(10, 12)
            .scalar(Metric::HeartRate, None, DecodeMode::Cumulative, 0i64)
            .unwrap();

        assert_eq!(series.values(), &[0, 0, 0]);
        assert!(!series.has_entries());
        assert!(series.recorded().is_none());
    }

    #[test]
    fn test_entries_past_window_end_are_clamped() {
        let series = decoder(0, 3)
            .scalar(Metric::HeartRate, Some("2,60;5,10;1,5"), DecodeMode::Cumulative, 0i64)
            .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.values(), &[60, 60, 60, 70]);
        assert_eq!(series.get(4), None);
    }

    #[test]
    fn test_huge_offsets_and_deltas_saturate() {
        let series = decoder(0, 3)
            .scalar(
                Metric::HeartRate,
                Some("1,9223372036854775807;9223372036854775807,5;9223372036854775807,1"),
                DecodeMode::Cumulative,
                0i64,
            )
            .unwrap();

        assert_eq!(series.len(), 4);
        assert_eq!(series.values(), &[i64::MAX, i64::MAX, i64::MAX, i64::MAX]);
    }

    #[test]
    fn test_malformed_segments() {
        let d = decoder(0, 10);

        let err = d
            .scalar::<i64>(Metric::Speed, Some("1,2;3"), DecodeMode::Fixed, 0)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Decode { ref metric, ref segment }
            if metric == "speed" && segment == "3"));

        let err = d
            .scalar::<i64>(Metric::HeartRate, Some("1,abc"), DecodeMode::Cumulative, 0)
            .unwrap_err();
        assert!(matches!(err, ConvertError::Decode { ref segment, .. } if segment == "1,abc"));

        // Only heart rate accepts an empty offset
        assert!(d
            .scalar::<f64>(Metric::Speed, Some(",2.0"), DecodeMode::Fixed, 0.0)
            .is_err());

        // Negative offsets would move the cursor backwards
        assert!(d
            .scalar::<i64>(Metric::HeartRate, Some("-1,80"), DecodeMode::Cumulative, 0)
            .is_err());

        assert!(d.gait(Some("1,2,3")).is_err());
    }

    #[test]
    fn test_altitude_sentinel_backfill() {
        let series = decoder(0, 3)
            .altitude(Some("-2000000;-2000000;780;780"), &[0, 1, 1, 1])
            .unwrap();

        assert_eq!(series.values(), &[780, 780, 780, 780]);
    }

    #[test]
    fn test_altitude_without_time_offsets() {
        let series = decoder(0, 3)
            .altitude(Some("-2000000;-2000000;780;790"), &[])
            .unwrap();

        assert_eq!(series.values(), &[780, 780, 780, 790]);
    }

    #[test]
    fn test_backfill_rules() {
        let mut values = vec![ALTITUDE_SENTINEL, 500, ALTITUDE_SENTINEL, 600, ALTITUDE_SENTINEL];
        backfill_sentinel(&mut values, ALTITUDE_SENTINEL);
        assert_eq!(values, vec![500, 500, 600, 600, ALTITUDE_SENTINEL]);

        let mut only_sentinels = vec![ALTITUDE_SENTINEL; 3];
        backfill_sentinel(&mut only_sentinels, ALTITUDE_SENTINEL);
        assert_eq!(only_sentinels, vec![ALTITUDE_SENTINEL; 3]);
    }

    #[test]
    fn test_coordinate_pairs_share_time_offsets() {
        let pair = decoder(0, 4)
            .pair(Some("4000000000,11600000000;100,-200;;50,50"), &[0, 2, 2])
            .unwrap();

        assert_eq!(
            pair.latitude.values(),
            &[4000000000, 4000000100, 4000000100, 4000000150, 4000000150]
        );
        assert_eq!(
            pair.longitude.values(),
            &[11600000000, 11599999800, 11599999800, 11599999850, 11599999850]
        );
        assert_eq!(pair.latitude.entry_count(), 3);
    }

    #[test]
    fn test_gait_tuples() {
        let gait = decoder(0, 5).gait(Some("1,2,70,160;2,4,72,164")).unwrap();

        assert_eq!(gait.steps.values(), &[2, 2, 6, 6, 6, 6]);
        assert_eq!(gait.stride.values(), &[70, 70, 72, 72, 72, 72]);
        assert_eq!(gait.frequency.values(), &[160, 160, 164, 164, 164, 164]);
    }

    #[test]
    fn test_time_offsets() {
        assert_eq!(time_offsets(Some("0;1;;2; 3 ;")).unwrap(), vec![0, 1, 2, 3]);
        assert!(time_offsets(None).unwrap().is_empty());
        assert!(time_offsets(Some("1,2")).is_err());
    }

    fn encode(entries: &[(u8, i64)]) -> String {
        entries
            .iter()
            .map(|(offset, value)| format!("{offset},{value}"))
            .collect::<Vec<_>>()
            .join(";")
    }

    proptest! {
        #[test]
        fn prop_series_covers_window_exactly(
            entries in prop::collection::vec((0u8..6, -20i64..20), 0..40),
            start in 0i64..1_000_000,
            span in 0i64..80,
            cumulative in any::<bool>(),
        ) {
            let mode = if cumulative { DecodeMode::Cumulative } else { DecodeMode::Fixed };
            let series = decoder(start, start + span)
                .scalar(Metric::HeartRate, Some(&encode(&entries)), mode, 0i64)
                .unwrap();

            let timestamps: Vec<i64> = series.iter().map(|(ts, _)| ts).collect();
            let expected: Vec<i64> = (start..=start + span).collect();
            prop_assert_eq!(timestamps, expected);
            prop_assert_eq!(series.entry_count(), entries.len());
        }

        #[test]
        fn prop_cumulative_non_negative_deltas_never_decrease(
            entries in prop::collection::vec((0u8..6, 0i64..20), 0..40),
            span in 0i64..80,
        ) {
            let series = decoder(0, span)
                .scalar(Metric::HeartRate, Some(&encode(&entries)), DecodeMode::Cumulative, 0i64)
                .unwrap();

            for pair in series.values().windows(2) {
                prop_assert!(pair[0] <= pair[1]);
            }
        }
    }
}
