//! Rust client for the realtime API: a socket connection plus local state
//! reconciliation for threads, notifications and the feed.

pub mod reconcile;
pub mod socket;

pub use reconcile::{ChatThread, FeedState, Keyed, NotificationInbox, Timeline};
pub use socket::{ClientError, RealtimeClient};
