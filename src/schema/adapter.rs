//! Loading of raw export payloads
//!
//! Handles the shapes the retrieval layer produces: the stored summaries
//! array, detail files that may or may not still carry the web envelope, and
//! the paginated history feed.

use crate::error::ConvertError;
use crate::schema::raw_activity::{
    ExportResponse, RawActivityDetail, RawActivitySummary, SummaryPage,
};
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// File name of the stored history inside an export directory
pub const SUMMARIES_FILENAME: &str = "summaries.json";

/// Adapter for turning raw export JSON into typed records
pub struct ExportAdapter;

impl ExportAdapter {
    /// Parse a JSON array of activity summaries
    pub fn parse_summaries(json: &str) -> Result<Vec<RawActivitySummary>, ConvertError> {
        let summaries: Vec<RawActivitySummary> = serde_json::from_str(json)?;
        Ok(summaries)
    }

    /// Parse a single summary object
    pub fn parse_summary(json: &str) -> Result<RawActivitySummary, ConvertError> {
        unwrap_envelope(json)
    }

    /// Parse an activity detail, with or without the `{code, message, data}` envelope
    pub fn parse_detail(json: &str) -> Result<RawActivityDetail, ConvertError> {
        unwrap_envelope(json)
    }

    /// Parse one history page, with or without the envelope
    pub fn parse_summary_page(json: &str) -> Result<SummaryPage, ConvertError> {
        unwrap_envelope(json)
    }
}

fn unwrap_envelope<T: DeserializeOwned>(json: &str) -> Result<T, ConvertError> {
    let value: serde_json::Value = serde_json::from_str(json)?;
    let is_envelope = value
        .get("data")
        .map(serde_json::Value::is_object)
        .unwrap_or(false);

    if is_envelope {
        let response: ExportResponse<T> = serde_json::from_value(value)?;
        Ok(response.data)
    } else {
        Ok(serde_json::from_value(value)?)
    }
}

/// A producer of history pages, keyed by the track id to continue from
pub trait PageSource {
    /// Fetch the page starting at `from_track_id` (`None` for the newest page)
    fn fetch_page(&mut self, from_track_id: Option<i64>) -> Result<SummaryPage, ConvertError>;
}

/// Lazy pull loop over a paginated history.
///
/// Yields one batch of summaries per page until the end marker is reached.
/// Iteration stops after the first error; [`SummaryPages::cursor`] tells where
/// to resume from.
pub struct SummaryPages<S> {
    source: S,
    cursor: Option<i64>,
    done: bool,
}

impl<S: PageSource> SummaryPages<S> {
    /// Start from the newest page
    pub fn new(source: S) -> Self {
        Self {
            source,
            cursor: None,
            done: false,
        }
    }

    /// Resume from a previously reported cursor
    pub fn resume(source: S, cursor: i64) -> Self {
        Self {
            source,
            cursor: Some(cursor),
            done: false,
        }
    }

    /// Cursor of the next page to fetch
    pub fn cursor(&self) -> Option<i64> {
        self.cursor
    }

    /// Drain every page into a single list
    pub fn collect_all(self) -> Result<Vec<RawActivitySummary>, ConvertError> {
        let mut summaries = Vec::new();
        for page in self {
            summaries.extend(page?);
        }
        Ok(summaries)
    }
}

impl<S: PageSource> Iterator for SummaryPages<S> {
    type Item = Result<Vec<RawActivitySummary>, ConvertError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.source.fetch_page(self.cursor) {
            Ok(page) => {
                debug!(
                    entries = page.summary.len(),
                    next = page.next,
                    "history page retrieved"
                );
                match page.next_cursor() {
                    // A cursor that does not move would loop forever
                    Some(next) if Some(next) != self.cursor => self.cursor = Some(next),
                    _ => self.done = true,
                }
                Some(Ok(page.summary))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// A directory written by the download step: `summaries.json` plus one
/// `<trackid>.json` detail file per activity
#[derive(Debug, Clone)]
pub struct ExportDirectory {
    root: PathBuf,
}

impl ExportDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn summaries_path(&self) -> PathBuf {
        self.root.join(SUMMARIES_FILENAME)
    }

    pub fn detail_path(&self, track_id: &str) -> PathBuf {
        self.root.join(format!("{track_id}.json"))
    }

    /// Load the stored history
    pub fn summaries(&self) -> Result<Vec<RawActivitySummary>, ConvertError> {
        let path = self.summaries_path();
        if !path.is_file() {
            return Err(ConvertError::MissingData(format!(
                "{} in {}",
                SUMMARIES_FILENAME,
                self.root.display()
            )));
        }
        ExportAdapter::parse_summaries(&fs::read_to_string(path)?)
    }

    /// Load the detail matching a summary
    pub fn detail_for(
        &self,
        summary: &RawActivitySummary,
    ) -> Result<RawActivityDetail, ConvertError> {
        let track_id = summary
            .trackid
            .ok_or_else(|| ConvertError::MissingData("trackid".to_string()))?;
        let json = fs::read_to_string(self.detail_path(&track_id.to_string()))?;
        ExportAdapter::parse_detail(&json)
    }
}
