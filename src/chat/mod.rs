pub mod controller;
pub mod models;

pub use controller::{ChatController, ExchangeHandle, ExchangeOutcome};
pub use models::{Message, MessageState, Role, Transcript};
