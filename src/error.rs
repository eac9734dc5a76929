use std::path::PathBuf;

use thiserror::Error;

/// Failure to read a photo or to find the tags the organizer needs.
#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("unable to open {path}: {source}")]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to read EXIF from {path}: {source}")]
    Exif { path: PathBuf, source: exif::Error },

    #[error("{path} has no {tag} tag")]
    MissingTag { path: PathBuf, tag: &'static str },

    #[error("{path} has an unparsable timestamp {value:?}")]
    InvalidTimestamp { path: PathBuf, value: String },

    #[error("{path} has unusable GPS data: {reason}")]
    InvalidGps { path: PathBuf, reason: String },
}

/// Reverse geocoding failed or answered with something unusable.
#[derive(Error, Debug)]
pub enum GeocodeError {
    #[error("geocode request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("geocode service answered {status}: {message}")]
    Status { status: String, message: String },

    #[error("geocode service returned no results")]
    NoResults,

    #[error("malformed geocode response: {0}")]
    Malformed(String),
}

/// A single folder or move operation failed.
#[derive(Error, Debug)]
pub enum FilesystemError {
    #[error("unable to create folder {path}: {source}")]
    CreateFolder {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to move {from} to {to}: {source}")]
    Move {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },

    #[error("unable to list {path}: {reason}")]
    List { path: PathBuf, reason: String },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unable to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no Google Maps API key configured")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Geocode(#[from] GeocodeError),

    #[error(transparent)]
    Filesystem(#[from] FilesystemError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type Result<T> = std::result::Result<T, Error>;
