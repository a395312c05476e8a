pub mod config;
pub mod error;
pub mod feed;
pub mod geometry;
pub mod graph;
pub mod sim;
pub mod stage;
pub mod util;

pub use config::LightsConfig;
pub use error::{LightsError, Result};
