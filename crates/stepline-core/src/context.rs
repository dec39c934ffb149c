use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::ContextError;

// ─── ExecContext ──────────────────────────────────────────────────────────

/// Cancellation scope handed unchanged to every action in a run.
///
/// Ends either when its token is cancelled (by this context or any ancestor)
/// or when its deadline passes. Clones share the same token, so cancelling a
/// clone cancels the original.
///
/// ```rust,ignore
/// let ctx = ExecContext::new().with_timeout(Duration::from_secs(30));
/// tokio::select! {
///     out = child.wait() => { /* … */ }
///     reason = ctx.done() => return Err(reason.into()),
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct ExecContext {
    token: CancellationToken,
    deadline: Option<Instant>,
}

impl ExecContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing token, e.g. one tripped by a Ctrl-C handler.
    pub fn from_token(token: CancellationToken) -> Self {
        Self {
            token,
            deadline: None,
        }
    }

    /// A context cancelled whenever `self` is, but which can also be
    /// cancelled on its own without affecting `self`.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
            deadline: self.deadline,
        }
    }

    /// A child context that also ends at `deadline`. An earlier inherited
    /// deadline is kept.
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(existing) if existing <= deadline => existing,
            _ => deadline,
        };
        Self {
            token: self.token.child_token(),
            deadline: Some(deadline),
        }
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Why the context ended, or `None` while it is still live.
    ///
    /// Explicit cancellation is reported even if the deadline has also passed.
    pub fn err(&self) -> Option<ContextError> {
        if self.token.is_cancelled() {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    pub fn is_done(&self) -> bool {
        self.err().is_some()
    }

    /// Resolves once the context ends, yielding the reason.
    pub async fn done(&self) -> ContextError {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => ContextError::Canceled,
                _ = tokio::time::sleep_until(deadline) => ContextError::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                ContextError::Canceled
            }
        }
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_context_is_live() {
        let ctx = ExecContext::new();
        assert_eq!(ctx.err(), None);
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn cancel_reports_canceled() {
        let ctx = ExecContext::new();
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn parent_cancel_reaches_child_but_not_the_reverse() {
        let parent = ExecContext::new();
        let child = parent.child();
        child.cancel();
        assert!(parent.err().is_none());

        let other = parent.child();
        parent.cancel();
        assert_eq!(other.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn clones_share_cancellation() {
        let ctx = ExecContext::new();
        let clone = ctx.clone();
        clone.cancel();
        assert!(ctx.is_done());
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_passes() {
        let ctx = ExecContext::new().with_timeout(Duration::from_millis(50));
        assert_eq!(ctx.err(), None);
        tokio::time::advance(Duration::from_millis(51)).await;
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
    }

    #[tokio::test(start_paused = true)]
    async fn earlier_inherited_deadline_wins() {
        let parent = ExecContext::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(10));
        assert_eq!(child.deadline(), parent.deadline());

        let tighter = parent.with_timeout(Duration::from_millis(10));
        assert!(tighter.deadline() < parent.deadline());
    }

    #[tokio::test(start_paused = true)]
    async fn done_resolves_on_deadline() {
        let ctx = ExecContext::new().with_timeout(Duration::from_secs(5));
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
    }

    #[tokio::test]
    async fn done_resolves_on_cancel() {
        let ctx = ExecContext::new();
        let handle = ctx.clone();
        tokio::spawn(async move { handle.cancel() });
        assert_eq!(ctx.done().await, ContextError::Canceled);
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_wins_over_passed_deadline() {
        let ctx = ExecContext::new().with_timeout(Duration::from_millis(1));
        tokio::time::advance(Duration::from_millis(2)).await;
        ctx.cancel();
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
        assert_eq!(ctx.done().await, ContextError::Canceled);
    }
}
