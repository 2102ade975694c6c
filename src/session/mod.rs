pub mod controller;
pub mod models;
pub mod store;

pub use controller::{SessionController, SessionState};
pub use models::Session;
pub use store::SessionStore;
