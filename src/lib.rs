pub mod api;
pub mod config;
pub mod error;
pub mod models;
pub mod openapi;
pub mod services;
pub mod state;
pub mod utils;

pub use config::Config;
pub use error::{AppError, AppResult, VotingError};
pub use openapi::ApiDoc;
pub use state::AppState;
