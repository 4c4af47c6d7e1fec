//! Lookup and upload state machines.
//!
//! One flow instance tracks one user session's form. A flow admits a single
//! submission at a time; finished flows may be resubmitted, which restarts
//! them from the searching/validating state.

use crate::models::pair::SagaStatus;
use crate::{AppError, ImageTextPair};
use thiserror::Error;

/// A transition that the current state does not allow.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("A submission is already in flight ({0})")]
    InFlight(&'static str),

    #[error("Cannot move from {from} to {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

impl From<FlowError> for AppError {
    fn from(value: FlowError) -> Self {
        tracing::error!("flow misuse: {}", value);
        AppError::Internal
    }
}

/// States of a text or image lookup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LookupState {
    #[default]
    Idle,
    Searching { query: String },
    Found(Vec<ImageTextPair>),
    NotFound,
    Failed(String),
}

impl LookupState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Searching { .. } => "searching",
            Self::Found(_) => "found",
            Self::NotFound => "not_found",
            Self::Failed(_) => "failed",
        }
    }
}

/// `Idle -> Searching -> {Found, NotFound, Failed}`; `clear()` returns to Idle.
#[derive(Debug, Default)]
pub struct LookupFlow {
    state: LookupState,
}

impl LookupFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LookupState {
        &self.state
    }

    /// Start a search for `query`.
    ///
    /// # Errors
    /// [`FlowError::InFlight`] while a previous search is unresolved.
    pub fn submit(&mut self, query: impl Into<String>) -> Result<(), FlowError> {
        if matches!(self.state, LookupState::Searching { .. }) {
            return Err(FlowError::InFlight("searching"));
        }
        self.state = LookupState::Searching {
            query: query.into(),
        };
        Ok(())
    }

    /// Clearing the input abandons any pending result.
    pub fn clear(&mut self) {
        self.state = LookupState::Idle;
    }

    /// Settle the pending search.
    ///
    /// An empty row set and [`AppError::NotFound`] both become `NotFound`;
    /// every other error becomes `Failed`.
    ///
    /// # Returns
    /// `false` when there was no pending search (for example after `clear()`)
    /// and the result was dropped.
    pub fn resolve(&mut self, result: Result<Vec<ImageTextPair>, AppError>) -> bool {
        if !matches!(self.state, LookupState::Searching { .. }) {
            return false;
        }
        self.state = match result {
            Ok(rows) if rows.is_empty() => LookupState::NotFound,
            Ok(rows) => LookupState::Found(rows),
            Err(AppError::NotFound) => LookupState::NotFound,
            Err(err) => LookupState::Failed(err.to_string()),
        };
        true
    }
}

/// Why an upload was refused before touching storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    Invalid,
    DuplicateImage,
    DuplicateText,
}

/// States of an upload submission.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum UploadState {
    #[default]
    Idle,
    Validating,
    Rejected(RejectReason),
    Uploading,
    Inserting,
    Done(ImageTextPair),
    Failed(String),
}

impl UploadState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Rejected(_) => "rejected",
            Self::Uploading => "uploading",
            Self::Inserting => "inserting",
            Self::Done(_) => "done",
            Self::Failed(_) => "failed",
        }
    }

    fn in_flight(&self) -> bool {
        matches!(self, Self::Validating | Self::Uploading | Self::Inserting)
    }
}

/// `Idle -> Validating -> {Rejected, Uploading -> Inserting -> Done} | Failed`.
///
/// Also records the saga status of the stored object once an upload starts.
#[derive(Debug, Default)]
pub struct UploadFlow {
    state: UploadState,
    saga: Option<SagaStatus>,
}

impl UploadFlow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &UploadState {
        &self.state
    }

    /// Saga status of the current submission, once an object was uploaded.
    pub fn saga(&self) -> Option<SagaStatus> {
        self.saga
    }

    pub fn is_in_flight(&self) -> bool {
        self.state.in_flight()
    }

    /// Return to `Idle`; refused while a submission is in flight.
    pub fn reset(&mut self) -> Result<(), FlowError> {
        if self.is_in_flight() {
            return Err(FlowError::InFlight(self.state.name()));
        }
        self.state = UploadState::Idle;
        self.saga = None;
        Ok(())
    }

    pub fn begin(&mut self) -> Result<(), FlowError> {
        if self.is_in_flight() {
            return Err(FlowError::InFlight(self.state.name()));
        }
        self.state = UploadState::Validating;
        self.saga = None;
        Ok(())
    }

    pub fn reject(&mut self, reason: RejectReason) -> Result<(), FlowError> {
        self.expect_state(UploadState::Validating, "rejected")?;
        self.state = UploadState::Rejected(reason);
        Ok(())
    }

    pub fn start_upload(&mut self) -> Result<(), FlowError> {
        self.expect_state(UploadState::Validating, "uploading")?;
        self.state = UploadState::Uploading;
        Ok(())
    }

    /// The object is stored; the pair row is next.
    pub fn start_insert(&mut self) -> Result<(), FlowError> {
        self.expect_state(UploadState::Uploading, "inserting")?;
        self.state = UploadState::Inserting;
        self.saga = Some(SagaStatus::Pending);
        Ok(())
    }

    pub fn finish(&mut self, pair: ImageTextPair) -> Result<(), FlowError> {
        self.expect_state(UploadState::Inserting, "done")?;
        self.state = UploadState::Done(pair);
        self.saga = Some(SagaStatus::Committed);
        Ok(())
    }

    /// Record a backend failure at any in-flight stage.
    pub fn fail(&mut self, error: &AppError) -> Result<(), FlowError> {
        if !self.is_in_flight() {
            return Err(FlowError::InvalidTransition {
                from: self.state.name(),
                to: "failed",
            });
        }
        self.state = UploadState::Failed(error.to_string());
        Ok(())
    }

    /// Mark the orphaned object as removed after a failed insert.
    pub fn rolled_back(&mut self) {
        if self.saga == Some(SagaStatus::Pending) {
            self.saga = Some(SagaStatus::RolledBack);
        }
    }

    fn expect_state(&self, expected: UploadState, to: &'static str) -> Result<(), FlowError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(FlowError::InvalidTransition {
                from: self.state.name(),
                to,
            })
        }
    }
}
