//! Batch operations: repeated single-item edits with a per-item report.
//!
//! There is no transaction. Items run in input order; the first failure
//! stops the batch, earlier edits stay applied and later items are reported
//! as not attempted.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

use crate::error::{EngineError, Result};
use crate::modification::ModificationService;
use crate::text::snippet_preview;

/// Outcome of one item in a batch or one file in a rename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    Applied,
    Failed { error: String },
    NotAttempted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItem {
    /// Member name, or the snippet's first line when it did not parse.
    pub target: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    pub items: Vec<BatchItem>,
    #[serde(skip)]
    error: Option<EngineError>,
}

impl BatchReport {
    pub fn applied(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.status == ItemStatus::Applied)
            .count()
    }

    /// True when every item was applied.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    pub fn error(&self) -> Option<&EngineError> {
        self.error.as_ref()
    }

    /// The first failure as an error, for callers that want propagation.
    pub fn into_result(self) -> Result<Self> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self),
        }
    }
}

pub struct BatchService {
    modification: Arc<ModificationService>,
}

impl BatchService {
    pub fn new(modification: Arc<ModificationService>) -> Self {
        Self { modification }
    }

    pub fn add_methods(&self, file: &Path, type_name: &str, sources: &[String]) -> BatchReport {
        run(sources, snippet_preview, |s| {
            self.modification.add_method(file, type_name, s)
        })
    }

    pub fn add_properties(&self, file: &Path, type_name: &str, sources: &[String]) -> BatchReport {
        run(sources, snippet_preview, |s| {
            self.modification.add_property(file, type_name, s)
        })
    }

    pub fn remove_methods(&self, file: &Path, type_name: &str, names: &[String]) -> BatchReport {
        run(names, str::to_string, |n| {
            self.modification.remove_method(file, type_name, n)
        })
    }
}

fn run<L, F>(inputs: &[String], label: L, mut apply: F) -> BatchReport
where
    L: Fn(&str) -> String,
    F: FnMut(&str) -> Result<()>,
{
    let mut report = BatchReport::default();
    for input in inputs {
        let status = if report.error.is_some() {
            ItemStatus::NotAttempted
        } else {
            match apply(input) {
                Ok(()) => ItemStatus::Applied,
                Err(e) => {
                    warn!(item = %label(input), error = %e, "batch item failed, stopping");
                    let status = ItemStatus::Failed {
                        error: e.to_string(),
                    };
                    report.error = Some(e);
                    status
                }
            }
        };
        report.items.push(BatchItem {
            target: label(input),
            status,
        });
    }
    report
}
