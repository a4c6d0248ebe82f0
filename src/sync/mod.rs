//! The synchronization core: cooperative cancellation, the event reducer,
//! the synchronized view state machine, and the composite merge.

mod cancel;
mod composite;
mod reduce;
mod view;

pub use cancel::CancelToken;
pub use composite::merge2;
pub use reduce::{apply_event, EventAction, RecordEvent};
pub use view::{Collection, SyncedView, ViewState};
