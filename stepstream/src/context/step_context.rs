//! Context passed into step execution.

use super::CancellationToken;
use crate::errors::StepError;
use std::sync::Arc;
use uuid::Uuid;

/// A cheap-to-clone context carrying a run identity and a cancellation token.
///
/// Cancellation is cooperative. `start` and `close` never consult the token;
/// a step started with an already-cancelled context still runs its wrapped
/// function and still produces one result per input. Wrapped functions that
/// want to stop early call [`ensure_active`](Self::ensure_active) or await
/// [`cancelled`](Self::cancelled).
#[derive(Debug, Clone)]
pub struct StepContext {
    run_id: Uuid,
    token: Arc<CancellationToken>,
}

impl Default for StepContext {
    fn default() -> Self {
        Self::new()
    }
}

impl StepContext {
    /// Creates a context with a fresh run ID and token.
    #[must_use]
    pub fn new() -> Self {
        Self::with_token(Arc::new(CancellationToken::new()))
    }

    /// Creates a context sharing an existing token.
    #[must_use]
    pub fn with_token(token: Arc<CancellationToken>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            token,
        }
    }

    /// Derives a context with its own run ID that is cancelled with this one.
    #[must_use]
    pub fn child(&self) -> Self {
        Self::with_token(self.token.clone())
    }

    /// Returns the run ID.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the cancellation token.
    #[must_use]
    pub fn token(&self) -> &Arc<CancellationToken> {
        &self.token
    }

    /// Requests cancellation.
    pub fn cancel(&self, reason: impl Into<String>) {
        self.token.cancel(reason);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Returns `Err(StepError::Cancelled)` once cancellation was requested.
    pub fn ensure_active(&self) -> Result<(), StepError> {
        if self.token.is_cancelled() {
            let reason = self
                .token
                .reason()
                .unwrap_or_else(|| "cancelled".to_string());
            return Err(StepError::Cancelled(reason));
        }
        Ok(())
    }

    /// Waits until cancellation is requested.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
