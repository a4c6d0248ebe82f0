//! The synchronized view: one remote collection kept continuously consistent
//! for one value of its governing parameter.
//!
//! A view composes three overlapping lifecycles: an in-flight fetch, a live
//! push subscription, and changes of the parameter that invalidate both.
//! Every parameter change starts a new *generation* (fetch plus subscribe
//! under a fresh cancellation token) and synchronously supersedes the old
//! one. A superseded generation's late completions and stray events are
//! detected by generation comparison and suppressed before they can touch
//! newer state.

use crate::error::SharedError;
use crate::store::{EventHandler, Unsubscribe};
use crate::sync::{CancelToken, RecordEvent};
use crate::{Error, Result};
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tracing::{debug, trace};

/// One collection as a synchronized view sees it: how to fetch a snapshot
/// for a parameter value, how to open a live subscription scoped the same
/// way, and how to fold one event into the snapshot.
#[async_trait::async_trait]
pub trait Collection: Send + Sync + 'static {
    /// The governing parameter. A view restarts its pipeline only when a
    /// new parameter compares unequal to the current one.
    type Param: Clone + PartialEq + Send + Sync + 'static;

    /// The materialized value the view keeps live.
    type Snapshot: Clone + Send + Sync + 'static;

    /// Fetches the initial snapshot. Must fail with `Error::Cancelled` when
    /// `cancel` fires first.
    async fn fetch(&self, param: &Self::Param, cancel: &CancelToken) -> Result<Self::Snapshot>;

    /// Opens the live channel scoped to the same filter as
    /// [`Collection::fetch`].
    async fn subscribe(&self, param: &Self::Param, handler: EventHandler) -> Result<Unsubscribe>;

    /// Folds one raw event into the snapshot. Pure: must not mutate the
    /// input. An event whose record does not decode leaves the snapshot
    /// unchanged.
    fn reduce(&self, snapshot: &Self::Snapshot, event: &RecordEvent<Value>) -> Self::Snapshot;
}

/// The observable state of a synchronized view.
#[derive(Debug, Clone, Default)]
pub enum ViewState<T> {
    /// Constructed but never activated.
    #[default]
    Idle,
    /// A pipeline is in flight. The previous value, if any, is retained so
    /// consumers can keep showing the last-known value instead of flashing
    /// empty.
    Loading { stale: Option<T> },
    Ready(T),
    /// The pipeline failed. No value is exposed, even if a snapshot had
    /// been fetched: a view that cannot maintain liveness is not shown as
    /// ready.
    Error(SharedError),
    Disposed,
}

impl<T> ViewState<T> {
    /// True when [`ViewState::value`] returns something: ready, or loading
    /// with a retained previous value.
    pub fn has_value(&self) -> bool {
        self.value().is_some()
    }

    /// The current value, or the retained stale value while loading.
    pub fn value(&self) -> Option<&T> {
        match self {
            ViewState::Ready(value) => Some(value),
            ViewState::Loading { stale } => stale.as_ref(),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            ViewState::Error(e) => Some(e.as_ref()),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, ViewState::Loading { .. })
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ViewState::Ready(_))
    }

    pub fn is_disposed(&self) -> bool {
        matches!(self, ViewState::Disposed)
    }

    /// Replaces this state with `Loading`, carrying the previous value
    /// forward as stale.
    fn begin_loading(&mut self) {
        let stale = match std::mem::replace(self, ViewState::Idle) {
            ViewState::Ready(value) => Some(value),
            ViewState::Loading { stale } => stale,
            _ => None,
        };
        *self = ViewState::Loading { stale };
    }
}

/// Bookkeeping for the currently live pipeline generation. One mutex guards
/// all of it so that superseding is atomic with respect to the checks made
/// by in-flight pipeline tasks and event handlers.
struct Pipeline<P> {
    generation: u64,
    param: Option<P>,
    cancel: CancelToken,
    unsubscribe: Option<Unsubscribe>,
    disposed: bool,
}

impl<P> Default for Pipeline<P> {
    fn default() -> Self {
        Self {
            generation: 0,
            param: None,
            cancel: CancelToken::new(),
            unsubscribe: None,
            disposed: false,
        }
    }
}

impl<P> Pipeline<P> {
    /// Supersedes the live generation: cancels its token and closes its
    /// subscription if one was open. Synchronous, so the caller can start
    /// the next generation without racing the old one.
    fn supersede(&mut self) {
        self.generation += 1;
        self.cancel.cancel();
        self.cancel = CancelToken::new();
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe.call();
        }
    }
}

struct Shared<C: Collection> {
    collection: C,
    state: watch::Sender<ViewState<C::Snapshot>>,
    pipeline: Mutex<Pipeline<C::Param>>,
}

/// A view over one collection, kept live until disposed.
///
/// Requires a tokio runtime: pipelines run as spawned tasks. Dropping the
/// view disposes it.
pub struct SyncedView<C: Collection> {
    shared: Arc<Shared<C>>,
}

impl<C: Collection> SyncedView<C> {
    /// Creates the view and immediately starts its first pipeline for
    /// `param`.
    pub fn start(collection: C, param: C::Param) -> Self {
        let (state, _) = watch::channel(ViewState::Idle);
        let view = Self {
            shared: Arc::new(Shared {
                collection,
                state,
                pipeline: Mutex::new(Pipeline::default()),
            }),
        };
        view.set_param(param);
        view
    }

    /// The current state, cloned out of the cell.
    pub fn state(&self) -> ViewState<C::Snapshot> {
        self.shared.state.borrow().clone()
    }

    /// A receiver for awaiting state changes. The value seen at subscribe
    /// time counts as seen.
    pub fn watch(&self) -> watch::Receiver<ViewState<C::Snapshot>> {
        self.shared.state.subscribe()
    }

    /// Changes the governing parameter, superseding the live pipeline and
    /// starting a new fetch+subscribe generation. Setting a parameter equal
    /// to the current one is a no-op; equality, not identity, gates the
    /// restart. No-op after disposal.
    pub fn set_param(&self, param: C::Param) {
        let (generation, cancel) = {
            let mut pipeline = self.shared.pipeline.lock().expect("pipeline lock poisoned");
            if pipeline.disposed || pipeline.param.as_ref() == Some(&param) {
                return;
            }
            pipeline.supersede();
            pipeline.param = Some(param.clone());
            // Published under the lock so that concurrent restarts and the
            // pipelines' own generation-checked publishes stay in order.
            self.shared.state.send_modify(ViewState::begin_loading);
            (pipeline.generation, pipeline.cancel.clone())
        };
        let shared = self.shared.clone();
        tokio::spawn(async move {
            run_pipeline(shared, generation, cancel, param).await;
        });
    }

    /// Tears the view down: supersedes the live pipeline exactly like a
    /// parameter change, but with no successor. Idempotent.
    pub fn dispose(&self) {
        let mut pipeline = self.shared.pipeline.lock().expect("pipeline lock poisoned");
        if pipeline.disposed {
            return;
        }
        pipeline.supersede();
        pipeline.param = None;
        pipeline.disposed = true;
        self.shared
            .state
            .send_modify(|state| *state = ViewState::Disposed);
    }
}

impl<C: Collection> Drop for SyncedView<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

/// One generation: fetch, publish, subscribe, retain the unsubscribe handle.
/// Every step re-checks that this generation is still the live one before
/// producing side effects.
async fn run_pipeline<C: Collection>(
    shared: Arc<Shared<C>>,
    generation: u64,
    cancel: CancelToken,
    param: C::Param,
) {
    let snapshot = match shared.collection.fetch(&param, &cancel).await {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_cancelled() => {
            // The cancelling party already started a newer pipeline or
            // disposed the view; nothing to report.
            trace!("fetch superseded, abandoning generation {generation}");
            return;
        }
        Err(e) => {
            debug!("fetch failed for generation {generation}: {e}");
            shared.publish_error(generation, e);
            return;
        }
    };
    if cancel.is_cancelled() {
        return;
    }
    if !shared.publish_if_current(generation, ViewState::Ready(snapshot)) {
        return;
    }

    let handler: EventHandler = {
        let shared = shared.clone();
        Arc::new(move |event| shared.apply_event(generation, &event))
    };
    match shared.collection.subscribe(&param, handler).await {
        Ok(unsubscribe) => {
            let superseded = {
                let mut pipeline = shared.pipeline.lock().expect("pipeline lock poisoned");
                if pipeline.generation == generation && !cancel.is_cancelled() {
                    pipeline.unsubscribe = Some(unsubscribe);
                    None
                } else {
                    Some(unsubscribe)
                }
            };
            // Superseded while the channel was opening: close it now, since
            // the superseding party had nothing to close.
            if let Some(unsubscribe) = superseded {
                unsubscribe.call();
            }
        }
        Err(e) if e.is_cancelled() => {}
        Err(e) => {
            // Fail closed: the fetched snapshot is discarded rather than
            // shown without liveness.
            debug!("subscribe failed for generation {generation}: {e}");
            shared.publish_error(generation, e);
        }
    }
}

impl<C: Collection> Shared<C> {
    fn pipeline(&self) -> MutexGuard<'_, Pipeline<C::Param>> {
        self.pipeline.lock().expect("pipeline lock poisoned")
    }

    /// Writes `next` only if `generation` is still the live, uncancelled
    /// pipeline. The generation check and the state write happen under the
    /// pipeline lock so a supersede cannot interleave.
    fn publish_if_current(&self, generation: u64, next: ViewState<C::Snapshot>) -> bool {
        let pipeline = self.pipeline();
        if pipeline.generation != generation || pipeline.cancel.is_cancelled() {
            return false;
        }
        self.state.send_modify(|state| *state = next);
        true
    }

    fn publish_error(&self, generation: u64, error: Error) {
        self.publish_if_current(generation, ViewState::Error(Arc::new(error)));
    }

    /// Folds a live event into the snapshot, but only while the view is
    /// still `Ready` for the same generation. A stray event from a
    /// superseded pipeline never touches newer state, and an error state is
    /// never overwritten by an event.
    fn apply_event(&self, generation: u64, event: &RecordEvent<Value>) {
        let pipeline = self.pipeline();
        if pipeline.generation != generation || pipeline.cancel.is_cancelled() {
            trace!("dropping event for superseded generation {generation}");
            return;
        }
        self.state.send_modify(|state| {
            if let ViewState::Ready(snapshot) = state {
                *snapshot = self.collection.reduce(snapshot, event);
            }
        });
    }
}
