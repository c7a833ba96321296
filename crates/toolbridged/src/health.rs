//! Structured health reporting for daemon lifecycle events.

use std::path::Path;
use std::sync::Arc;

use toolbridge_config::CleanupOutcome;

use crate::bootstrap::BootstrapError;
use crate::server::{ServeError, ServeStats};

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer trait used to surface lifecycle events to telemetry sinks.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes successfully.
    fn bootstrap_succeeded(&self, tools: usize, output_path: &Path);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after the secret configuration file has been handled.
    fn config_cleanup(&self, path: &Path, outcome: &CleanupOutcome);

    /// Invoked when the request loop starts.
    fn serve_started(&self);

    /// Invoked when the request loop ends, successfully or not.
    fn serve_finished(&self, outcome: Result<&ServeStats, &ServeError>);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, tools: usize, output_path: &Path) {
        (**self).bootstrap_succeeded(tools, output_path);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn config_cleanup(&self, path: &Path, outcome: &CleanupOutcome) {
        (**self).config_cleanup(path, outcome);
    }

    fn serve_started(&self) {
        (**self).serve_started();
    }

    fn serve_finished(&self, outcome: Result<&ServeStats, &ServeError>) {
        (**self).serve_finished(outcome);
    }
}

/// Default reporter that records lifecycle events using `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting bridge bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, tools: usize, output_path: &Path) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            tools,
            output = %output_path.display(),
            "bridge bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "bridge bootstrap failed"
        );
    }

    fn config_cleanup(&self, path: &Path, outcome: &CleanupOutcome) {
        match outcome {
            CleanupOutcome::Removed | CleanupOutcome::AlreadyAbsent => tracing::info!(
                target: HEALTH_TARGET,
                event = "config_cleanup",
                path = %path.display(),
                outcome = ?outcome,
                "tool configuration removed"
            ),
            CleanupOutcome::Failed(error) => tracing::warn!(
                target: HEALTH_TARGET,
                event = "config_cleanup",
                path = %path.display(),
                error = %error,
                "tool configuration left on disk"
            ),
        }
    }

    fn serve_started(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "serve_started",
            "serving requests on stdio"
        );
    }

    fn serve_finished(&self, outcome: Result<&ServeStats, &ServeError>) {
        match outcome {
            Ok(stats) => tracing::info!(
                target: HEALTH_TARGET,
                event = "serve_finished",
                requests = stats.requests,
                responses = stats.responses,
                decode_errors = stats.decode_errors,
                notifications = stats.notifications,
                "request stream closed"
            ),
            Err(error) => tracing::error!(
                target: HEALTH_TARGET,
                event = "serve_finished",
                error = %error,
                "request loop aborted"
            ),
        }
    }
}
