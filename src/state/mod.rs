//! Thread lifecycle state machine.

pub mod lifecycle;

pub use self::lifecycle::{InvalidTransition, ThreadEvent, ThreadStatus, UnknownStatus};
