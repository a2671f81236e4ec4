//! Best-effort bookkeeping calls.
//!
//! Artifact marking and cleanup never decide whether an apply succeeded, so
//! their failures go to a [`DiagnosticsSink`] instead of the `errors` list.

use anyhow::Result;
use std::future::Future;
use std::sync::Mutex;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub operation: &'static str,
    pub target_id: String,
    pub message: String,
}

pub trait DiagnosticsSink: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);
}

/// Default sink: one `warn!` event per failed attempt.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl DiagnosticsSink for TracingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        warn!(
            operation = diagnostic.operation,
            target = %diagnostic.target_id,
            error = %diagnostic.message,
            "bookkeeping call failed"
        );
    }
}

/// Keeps every diagnostic in memory; used by tests and batch tooling.
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<Diagnostic> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticsSink for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(diagnostic);
    }
}

/// Runs `call`, reporting a failure to `sink`. Never propagates.
pub async fn attempt<T, F>(
    sink: &dyn DiagnosticsSink,
    operation: &'static str,
    target_id: &str,
    call: F,
) -> Option<T>
where
    F: Future<Output = Result<T>>,
{
    match call.await {
        Ok(value) => Some(value),
        Err(err) => {
            sink.report(Diagnostic {
                operation,
                target_id: target_id.to_string(),
                message: format!("{err:#}"),
            });
            None
        }
    }
}
