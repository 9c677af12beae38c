//! Pipeline orchestration
//!
//! This module provides the public API of zepp-fit: `decode` rebuilds a
//! [`SportContainer`] from one summary/detail pair and `convert` maps it to
//! FIT messages. [`Converter`] runs both stages for single activities and
//! batches, handing the messages to an [`OutputSink`].

use crate::config::{ConverterConfig, DeviceIdentity, UnsupportedPolicy};
use crate::container::SportContainerBuilder;
use crate::error::ConvertError;
use crate::mapper::{ExportMapper, ExportOutcome};
use crate::schema::{ExportDirectory, RawActivityDetail, RawActivitySummary};
use crate::sink::OutputSink;
use crate::sport::SportCategory;
use crate::types::SportContainer;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Rebuild the per-second container of one activity.
///
/// # Example
/// ```ignore
/// let container = decode(&summary, &detail)?;
/// assert_eq!(container.samples().len() as i64, container.duration_secs() + 1);
/// ```
pub fn decode(
    summary: &RawActivitySummary,
    detail: &RawActivityDetail,
) -> Result<SportContainer, ConvertError> {
    SportContainerBuilder::build(summary, detail)
}

/// Map a container to FIT messages with the default device identity.
///
/// Unsupported categories yield [`ExportOutcome::Unsupported`], never an error.
pub fn convert(
    container: &SportContainer,
    summary: &RawActivitySummary,
) -> Result<ExportOutcome, ConvertError> {
    let device = DeviceIdentity::default();
    ExportMapper::new(&device).map(container, summary)
}

/// One activity that failed inside a batch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedActivity {
    pub track_id: String,
    pub error: String,
}

/// Outcome counts of a batch conversion
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub converted: usize,
    pub skipped: usize,
    pub failed: Vec<FailedActivity>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.converted + self.skipped + self.failed.len()
    }

    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    fn record(&mut self, track_id: String, result: Result<ExportOutcome, ConvertError>) {
        match result {
            Ok(ExportOutcome::Messages(_)) => self.converted += 1,
            Ok(ExportOutcome::Unsupported(_)) => self.skipped += 1,
            Err(e) => {
                warn!(track_id = %track_id, error = %e, "activity conversion failed");
                self.failed.push(FailedActivity {
                    track_id,
                    error: e.to_string(),
                });
            }
        }
    }
}

/// Runs decode and convert for activities and forwards the messages to a sink.
pub struct Converter {
    config: ConverterConfig,
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConverterConfig::default())
    }
}

impl Converter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    /// Convert one activity into `sink`.
    ///
    /// Unsupported categories follow the configured [`UnsupportedPolicy`].
    /// Nothing reaches the sink unless the whole message list was built.
    pub fn convert_activity(
        &self,
        summary: &RawActivitySummary,
        detail: &RawActivityDetail,
        sink: &mut dyn OutputSink,
    ) -> Result<ExportOutcome, ConvertError> {
        let container = decode(summary, detail)?;
        let outcome = ExportMapper::new(&self.config.device).map(&container, summary)?;

        match &outcome {
            ExportOutcome::Messages(messages) => {
                sink.accept(container.id(), container.category(), messages)?;
                info!(
                    track_id = container.id(),
                    category = %container.category(),
                    seconds = container.samples().len(),
                    messages = messages.len(),
                    "activity converted"
                );
            }
            ExportOutcome::Unsupported(category) => match self.config.unsupported_policy {
                UnsupportedPolicy::Skip => {
                    info!(
                        track_id = container.id(),
                        category = %category,
                        "unsupported sport type, skipping"
                    );
                }
                UnsupportedPolicy::Report => {
                    return Err(ConvertError::UnsupportedSport {
                        code: container.sport_code().unwrap_or_default(),
                        track_id: container.id().to_string(),
                    });
                }
            },
        }

        Ok(outcome)
    }

    /// Convert every pair, isolating failures per activity
    pub fn convert_batch<'a, I>(&self, activities: I, sink: &mut dyn OutputSink) -> BatchReport
    where
        I: IntoIterator<Item = (&'a RawActivitySummary, &'a RawActivityDetail)>,
    {
        let mut report = BatchReport::default();
        for (summary, detail) in activities {
            let track_id = track_label(summary.trackid.or(detail.trackid));
            report.record(track_id, self.convert_activity(summary, detail, sink));
        }
        report
    }

    /// Convert the activities of a download directory that match `filter`.
    ///
    /// A missing or unreadable detail file fails only its activity; a missing
    /// summaries file fails the whole run.
    pub fn convert_directory<F>(
        &self,
        directory: &ExportDirectory,
        filter: F,
        sink: &mut dyn OutputSink,
    ) -> Result<BatchReport, ConvertError>
    where
        F: Fn(&RawActivitySummary) -> bool,
    {
        let summaries = directory.summaries()?;
        let mut report = BatchReport::default();

        for summary in summaries.iter().filter(|s| filter(s)) {
            let track_id = track_label(summary.trackid);
            let result = directory
                .detail_for(summary)
                .and_then(|detail| self.convert_activity(summary, &detail, sink));
            report.record(track_id, result);
        }

        info!(
            converted = report.converted,
            skipped = report.skipped,
            failed = report.failed.len(),
            "batch finished"
        );
        Ok(report)
    }
}

/// Count summaries per resolved category (`unknown-<code>` for unmapped codes)
pub fn category_counts(summaries: &[RawActivitySummary]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for summary in summaries {
        let category = SportCategory::from_code(summary.sport_type);
        *counts.entry(category.to_string()).or_insert(0) += 1;
    }
    counts
}

fn track_label(track_id: Option<i64>) -> String {
    track_id.map_or_else(|| "unknown".to_string(), |id| id.to_string())
}
