pub mod auth;
pub mod chat;
pub mod error;
pub mod help_centers;
pub mod lessons;
pub mod llm;
pub mod middleware;
pub mod reports;
pub mod router;
pub mod state;
pub mod storage;
pub mod stories;
pub mod tips;
pub mod transcribe;
pub mod upload;

pub use error::ApiError;
pub use router::app;
pub use state::{AppState, AppStateInner};
