pub mod config;
pub mod error;
pub mod handlers;
pub mod helpers;
pub mod state;

#[cfg(test)]
mod test_utils;

pub use config::ApiConfig;
pub use state::AppState;
