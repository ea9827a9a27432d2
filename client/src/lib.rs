//! Inkwell realtime client.
//!
//! [`manager::ConnectionManager`] owns the single event-stream connection a
//! process shares across all of its subscribers, suppresses duplicate
//! events and expires displayed notifications on a timer.

pub mod config;
pub mod display;
pub mod manager;
pub mod notification;
pub mod refresh;
pub mod transport;

pub use manager::{ConnectionManager, ConnectionState, Subscription};
pub use notification::DisplayedNotification;
