pub mod stream;
pub mod update;

pub use stream::{CloseReason, StreamEvent, StreamSettings, Subscription, subscribe};
pub use update::{TrackingUpdate, apply_tracking_update};
