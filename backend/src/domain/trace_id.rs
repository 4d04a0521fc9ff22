//! Correlation identifier shared by a request's logs, errors and the
//! background work it queues.
//!
//! The identifier lives in tokio task-local storage. Spawned tasks do not see
//! it, so queued work (receipt delivery, for one) records it at enqueue time
//! and re-enters it with [`TraceId::scope`].

use std::fmt;
use std::future::Future;
use std::str::FromStr;

use tokio::task_local;
use uuid::Uuid;

task_local! {
    static TRACE_ID: TraceId;
}

/// Identifier echoed in the `trace-id` header and in error payloads.
///
/// # Examples
/// ```
/// use fluxcart::TraceId;
///
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// let trace_id: TraceId = "00000000-0000-0000-0000-000000000000"
///     .parse()
///     .expect("valid UUID");
/// let observed = TraceId::scope(trace_id, async { TraceId::current() }).await;
/// assert_eq!(observed, Some(trace_id));
/// # });
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceId(Uuid);

impl TraceId {
    /// A fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// The identifier in scope for the running task, if any.
    #[must_use]
    pub fn current() -> Option<Self> {
        TRACE_ID.try_with(|id| *id).ok()
    }

    /// The identifier in scope, or a fresh one outside any request.
    #[must_use]
    pub fn current_or_generate() -> Self {
        Self::current().unwrap_or_else(Self::generate)
    }

    /// Run `fut` with `trace_id` in scope.
    pub async fn scope<Fut>(trace_id: Self, fut: Fut) -> Fut::Output
    where
        Fut: Future,
    {
        TRACE_ID.scope(trace_id, fut).await
    }
}

impl fmt::Display for TraceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for TraceId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const NIL: &str = "00000000-0000-0000-0000-000000000000";

    #[rstest]
    #[tokio::test]
    async fn scope_exposes_the_identifier() {
        let expected = TraceId::generate();
        let observed = TraceId::scope(expected, async { TraceId::current() }).await;
        assert_eq!(observed, Some(expected));
    }

    #[rstest]
    #[tokio::test]
    async fn nothing_is_in_scope_by_default() {
        assert!(TraceId::current().is_none());
    }

    #[rstest]
    #[tokio::test]
    async fn current_or_generate_prefers_the_scoped_identifier() {
        let expected: TraceId = NIL.parse().expect("valid uuid");
        let observed = TraceId::scope(expected, async { TraceId::current_or_generate() }).await;
        assert_eq!(observed, expected);
    }

    #[rstest]
    #[tokio::test]
    async fn current_or_generate_mints_outside_a_request() {
        assert_ne!(TraceId::current_or_generate(), TraceId::current_or_generate());
    }

    #[rstest]
    #[case::nil(NIL, true)]
    #[case::hyphenless("0f8fad5bd9cb469fa16570867728950e", true)]
    #[case::garbage("not-a-trace", false)]
    fn parses_uuid_text(#[case] text: &str, #[case] valid: bool) {
        assert_eq!(text.parse::<TraceId>().is_ok(), valid);
    }

    #[rstest]
    fn displays_as_hyphenated_uuid() {
        let trace_id: TraceId = NIL.parse().expect("valid uuid");
        assert_eq!(trace_id.to_string(), NIL);
    }
}
