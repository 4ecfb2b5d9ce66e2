//! HTTP API module

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{router, AppState, WebServer};
