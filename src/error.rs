use std::{io, path::PathBuf};

use image::ImageError;
use ndarray_npy::ReadNpyError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Everything that can go wrong while loading a dataset or rendering masks.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse scores in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to process image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: ImageError,
    },

    #[error("failed to read mask array {}: {source}", path.display())]
    Npy {
        path: PathBuf,
        #[source]
        source: ReadNpyError,
    },

    #[error(
        "mask {index} has shape {mask_height}x{mask_width} but the image is {image_height}x{image_width}"
    )]
    ShapeMismatch {
        index: usize,
        mask_height: usize,
        mask_width: usize,
        image_height: usize,
        image_width: usize,
    },

    #[error("no score for mask {index}: only {available} scores were supplied")]
    MissingScore { index: usize, available: usize },

    #[error("cannot lay out a grid with {num_cols} columns")]
    InvalidColumns { num_cols: usize },

    #[error("a {rows}x{cols} figure is too large to export as one image")]
    FigureTooLarge { rows: usize, cols: usize },
}

impl Error {
    /// Returns `true` when the error was caused by a file that does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            Error::Image {
                source: ImageError::IoError(source),
                ..
            } => source.kind() == io::ErrorKind::NotFound,
            _ => false,
        }
    }
}
