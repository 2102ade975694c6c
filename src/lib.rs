pub mod api;
pub mod chat;
pub mod cli;
mod client;
pub mod core;
pub mod session;
pub mod stream;

pub use client::Client;
