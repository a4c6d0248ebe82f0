//! Merges constituent view states into one composite state.

use crate::sync::ViewState;

/// Merges two synchronized views sharing the same governing parameter into
/// one derived state:
///
/// - `Ready` only when both constituents are ready, built by `ready`;
/// - `Error` when either constituent has errored; the first error in fixed
///   constituent order wins, later ones are not queued;
/// - `Disposed` when either constituent was disposed;
/// - `Loading` otherwise, surfacing `stale` (the last composite ready
///   value) if the caller retained one.
///
/// Evaluated by pull: the caller recomputes from the constituents' current
/// states on read, so the composite is consistent with its latest inputs by
/// the time it is read.
pub fn merge2<A, B, T>(
    a: &ViewState<A>,
    b: &ViewState<B>,
    stale: Option<T>,
    ready: impl FnOnce(&A, &B) -> T,
) -> ViewState<T> {
    if a.is_disposed() || b.is_disposed() {
        return ViewState::Disposed;
    }
    if let ViewState::Error(e) = a {
        return ViewState::Error(e.clone());
    }
    if let ViewState::Error(e) = b {
        return ViewState::Error(e.clone());
    }
    match (a, b) {
        (ViewState::Ready(a), ViewState::Ready(b)) => ViewState::Ready(ready(a, b)),
        _ => ViewState::Loading { stale },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;
    use std::sync::Arc;

    fn ready(n: u32) -> ViewState<u32> {
        ViewState::Ready(n)
    }

    fn errored(message: &str) -> ViewState<u32> {
        ViewState::Error(Arc::new(Error::transport(message)))
    }

    fn loading() -> ViewState<u32> {
        ViewState::Loading { stale: None }
    }

    fn merge(a: &ViewState<u32>, b: &ViewState<u32>, stale: Option<u32>) -> ViewState<u32> {
        merge2(a, b, stale, |a, b| a + b)
    }

    #[test]
    fn test_ready_only_when_all_ready() {
        let merged = merge(&ready(1), &ready(2), None);
        assert!(merged.is_ready());
        assert_eq!(merged.value(), Some(&3));
    }

    #[test]
    fn test_loading_when_any_loading() {
        let merged = merge(&ready(1), &loading(), None);
        assert!(merged.is_loading());
        assert!(!merged.has_value());
    }

    #[test]
    fn test_loading_surfaces_stale() {
        let merged = merge(&loading(), &ready(2), Some(3));
        assert!(merged.is_loading());
        assert_eq!(merged.value(), Some(&3));
    }

    #[test]
    fn test_first_error_wins() {
        let merged = merge(&errored("first"), &errored("second"), Some(3));
        let error = merged.error().expect("expected an error");
        assert!(error.to_string().contains("first"));
    }

    #[test]
    fn test_error_beats_loading_and_ready() {
        assert!(merge(&ready(1), &errored("boom"), None).error().is_some());
        assert!(merge(&loading(), &errored("boom"), None).error().is_some());
    }

    #[test]
    fn test_disposed_propagates() {
        let merged = merge(&ViewState::Disposed, &ready(2), None);
        assert!(merged.is_disposed());
    }
}
