//! Output sinks
//!
//! A sink receives the ordered message list of one activity. The binary FIT
//! encoder lives outside this crate; [`JsonDocumentSink`] writes the same
//! messages as a JSON document so converted activities can be inspected or
//! handed to another encoder.

use crate::error::ConvertError;
use crate::sport::SportCategory;
use crate::types::FitMessage;
use crate::{PRODUCT_NAME, VERSION};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use uuid::Uuid;

/// Destination for converted activities
pub trait OutputSink {
    /// Accept the messages of one activity. An error fails that activity.
    fn accept(
        &mut self,
        track_id: &str,
        category: SportCategory,
        messages: &[FitMessage],
    ) -> Result<(), ConvertError>;
}

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// One converted activity as written by [`JsonDocumentSink`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDocument {
    pub producer: Producer,
    pub track_id: String,
    pub category: SportCategory,
    pub messages: Vec<FitMessage>,
}

/// Writes `<category>-<trackid>.json` documents into a directory
pub struct JsonDocumentSink {
    output_dir: PathBuf,
    instance_id: String,
    written: Vec<PathBuf>,
}

impl JsonDocumentSink {
    /// Create a sink with a unique instance ID
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_instance_id(output_dir, Uuid::new_v4().to_string())
    }

    /// Create a sink with a specific instance ID
    pub fn with_instance_id(output_dir: impl Into<PathBuf>, instance_id: String) -> Self {
        Self {
            output_dir: output_dir.into(),
            instance_id,
            written: Vec::new(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Files written so far, in order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn file_name(track_id: &str, category: SportCategory) -> String {
        format!("{}-{}.json", category.as_str(), track_id)
    }

    /// Build the document without writing it
    pub fn document(
        &self,
        track_id: &str,
        category: SportCategory,
        messages: &[FitMessage],
    ) -> ActivityDocument {
        ActivityDocument {
            producer: Producer {
                name: PRODUCT_NAME.to_string(),
                version: VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            track_id: track_id.to_string(),
            category,
            messages: messages.to_vec(),
        }
    }
}

impl OutputSink for JsonDocumentSink {
    fn accept(
        &mut self,
        track_id: &str,
        category: SportCategory,
        messages: &[FitMessage],
    ) -> Result<(), ConvertError> {
        if messages.is_empty() {
            return Err(ConvertError::Sink(format!(
                "no messages for track {track_id}"
            )));
        }

        let document = self.document(track_id, category, messages);
        let json = serde_json::to_string_pretty(&document)?;

        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(Self::file_name(track_id, category));
        fs::write(&path, json)?;

        info!(path = %path.display(), messages = messages.len(), "activity document written");
        self.written.push(path);
        Ok(())
    }
}

/// Keeps every accepted activity in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    pub activities: Vec<(String, SportCategory, Vec<FitMessage>)>,
}

impl OutputSink for MemorySink {
    fn accept(
        &mut self,
        track_id: &str,
        category: SportCategory,
        messages: &[FitMessage],
    ) -> Result<(), ConvertError> {
        self.activities
            .push((track_id.to_string(), category, messages.to_vec()));
        Ok(())
    }
}
