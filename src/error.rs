use std::path::PathBuf;
use thiserror::Error;
use zip::result::ZipError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Install error: {0}")]
    Install(String),

    #[error("Process spawn error: {0}")]
    ProcessSpawn(String),

    #[error("Not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Config error: {0}")]
    Config(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Install(err.to_string())
    }
}
