//! Loading and visual inspection of segmentation masks.
//!
//! [`dataset`] reads a directory of images, mask stacks and scores. [`overlay`] draws a
//! [`MaskStack`] over its image as a grid of colored panels, returned as a [`Figure`].

pub mod colors;
pub mod dataset;
mod error;
pub mod figure;
mod mask;
pub mod overlay;

pub use dataset::{Dataset, DatasetLayout, get_images_masks_scores, load_dataset};
pub use error::{Error, Result};
pub use figure::{Figure, Panel};
pub use mask::MaskStack;
pub use overlay::{DEFAULT_NUM_COLS, plot_masks_and_scores};
