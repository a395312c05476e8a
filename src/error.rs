use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum LightsError {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed to read config file {}", .path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {}", .path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, LightsError>;
