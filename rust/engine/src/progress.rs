// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Progress reporting and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ConversionError, Result};
use crate::record::{ConversionRecord, RunSummary};

/// Receives diagnostics while a run progresses.
pub trait ProgressSink {
    fn log(&mut self, message: &str);

    /// Called once per record after it settles.
    fn record(&mut self, _record: &ConversionRecord) {}

    fn summary(&mut self, _summary: &RunSummary) {}
}

/// Sink that forwards everything to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ProgressSink for TracingSink {
    fn log(&mut self, message: &str) {
        tracing::info!("{message}");
    }

    fn record(&mut self, record: &ConversionRecord) {
        tracing::debug!(
            id = %record.original_id,
            kind = %record.type_name,
            status = %record.status,
            "Record settled"
        );
    }

    fn summary(&mut self, summary: &RunSummary) {
        tracing::info!(%summary, "Run finished");
    }
}

/// Sink that keeps everything it is given.
#[derive(Debug, Default, Clone)]
pub struct RunReport {
    pub messages: Vec<String>,
    pub records: Vec<ConversionRecord>,
    pub summary: Option<RunSummary>,
}

impl ProgressSink for RunReport {
    fn log(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }

    fn record(&mut self, record: &ConversionRecord) {
        self.records.push(record.clone());
    }

    fn summary(&mut self, summary: &RunSummary) {
        self.summary = Some(*summary);
    }
}

/// Shared cancellation flag, checked between objects.
#[derive(Debug, Default, Clone)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ConversionError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancellation_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(matches!(token.check(), Err(ConversionError::Cancelled)));
    }
}
