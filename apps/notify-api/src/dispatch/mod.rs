//! Outbound notification dispatch and the durable-store contract.

pub mod dispatcher;
pub mod store;

pub use dispatcher::{DeliveryOutcome, InvalidTarget, NotificationDispatcher};
pub use store::{NotificationState, NotificationStore};
