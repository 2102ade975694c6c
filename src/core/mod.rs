pub mod config;
pub mod error;
pub mod state;

pub use config::AppConfig;
pub use error::ClientError;
pub use state::{ChatPhase, ClientState, SharedState, Snapshot};
