//! Step records shared by the rotation and CRL runners

use serde::{Deserialize, Serialize};

/// Outcome of a single operator step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Done,
    /// Would have run, but this is a dry run
    Planned,
    Skipped,
    Failed,
}

impl StepStatus {
    /// Get the icon for this status
    pub fn icon(&self) -> &'static str {
        match self {
            StepStatus::Done => "✓",
            StepStatus::Planned => "→",
            StepStatus::Skipped => "⚠",
            StepStatus::Failed => "✗",
        }
    }
}

/// A single step within a run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step description
    pub description: String,
    /// Step status
    pub status: StepStatus,
    /// Additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl StepRecord {
    /// Create a completed step
    pub fn done(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::Done,
            details: None,
        }
    }

    /// Create a step that a dry run only plans
    pub fn planned(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::Planned,
            details: None,
        }
    }

    /// Create a skipped step with the reason
    pub fn skipped(description: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::Skipped,
            details: Some(reason.into()),
        }
    }

    /// Create a failed step with the error
    pub fn failed(description: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            status: StepStatus::Failed,
            details: Some(error.into()),
        }
    }

    /// Attach details
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Records steps, either performing them or (in a dry run) only planning them
#[derive(Debug, Default)]
pub struct StepLog {
    dry_run: bool,
    steps: Vec<StepRecord>,
}

impl StepLog {
    pub fn new(dry_run: bool) -> Self {
        Self {
            dry_run,
            steps: Vec::new(),
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Run `action` and record it as done, or record it as planned in a dry run
    pub fn perform<T, E: std::fmt::Display>(
        &mut self,
        description: impl Into<String>,
        action: impl FnOnce() -> Result<T, E>,
    ) -> Result<Option<T>, E> {
        let description = description.into();
        if self.dry_run {
            tracing::info!("[dry-run] {}", description);
            self.steps.push(StepRecord::planned(description));
            return Ok(None);
        }

        tracing::info!("{}", description);
        match action() {
            Ok(value) => {
                self.steps.push(StepRecord::done(description));
                Ok(Some(value))
            }
            Err(e) => {
                self.steps
                    .push(StepRecord::failed(description, e.to_string()));
                Err(e)
            }
        }
    }

    pub fn push(&mut self, step: StepRecord) {
        self.steps.push(step);
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}
