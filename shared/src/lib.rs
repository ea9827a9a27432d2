//! Wire types shared by the inkwell server and its clients.
//! Every realtime event travels as a JSON [`Envelope`] text frame.

pub mod envelope;

pub use envelope::{EventData, EventType, Envelope, Resource, UnknownEventType};
