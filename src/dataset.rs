//! Loading of `images/` + `masks/` + `scores.json` dataset directories.
//!
//! ```text
//! <base_dir>/
//!   scores.json                      { "<sample_key>": <number>, ... }
//!   images/<sample_key><image_ext>
//!   masks/<sample_key><mask_ext>     NPY array of shape (num_objects, H, W)
//! ```
//!
//! The keys of `scores.json` decide which samples exist and in which order they are
//! loaded. Image and mask shapes are not checked against each other here.

use std::{
    fs,
    path::{Path, PathBuf},
};

use image::{DynamicImage, ImageReader};
use indexmap::IndexMap;
use ndarray::Array3;
use ndarray_npy::{ReadNpyError, ReadNpyExt, ReadableElement};
use num_traits::Zero;

use crate::{
    error::{Error, Result},
    mask::MaskStack,
};

pub const SCORES_FILE: &str = "scores.json";
pub const IMAGES_DIR: &str = "images";
pub const MASKS_DIR: &str = "masks";

/// File extensions used to locate a sample's image and mask files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetLayout {
    /// Appended to the sample key inside `masks/`, including the dot.
    pub mask_ext: String,
    /// Appended to the sample key inside `images/`, including the dot.
    pub image_ext: String,
}

impl Default for DatasetLayout {
    fn default() -> Self {
        Self {
            mask_ext: ".npy".to_string(),
            image_ext: ".png".to_string(),
        }
    }
}

impl DatasetLayout {
    pub fn image_path(&self, base_dir: &Path, key: &str) -> PathBuf {
        base_dir.join(IMAGES_DIR).join(format!("{key}{}", self.image_ext))
    }

    pub fn mask_path(&self, base_dir: &Path, key: &str) -> PathBuf {
        base_dir.join(MASKS_DIR).join(format!("{key}{}", self.mask_ext))
    }
}

/// Images, mask stacks and scores of every sample, keyed by sample name.
///
/// The three maps always hold the same keys in the same order.
#[derive(Debug, Clone)]
pub struct Dataset {
    images: IndexMap<String, DynamicImage>,
    masks: IndexMap<String, MaskStack>,
    scores: IndexMap<String, f64>,
}

/// Borrowed view of a single sample.
#[derive(Debug, Clone, Copy)]
pub struct Sample<'a> {
    pub key: &'a str,
    pub image: &'a DynamicImage,
    pub masks: &'a MaskStack,
    pub score: f64,
}

impl Dataset {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Sample keys in `scores.json` order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    pub fn images(&self) -> &IndexMap<String, DynamicImage> {
        &self.images
    }

    pub fn masks(&self) -> &IndexMap<String, MaskStack> {
        &self.masks
    }

    pub fn scores(&self) -> &IndexMap<String, f64> {
        &self.scores
    }

    pub fn sample(&self, key: &str) -> Option<Sample<'_>> {
        let (key, score) = self.scores.get_key_value(key)?;
        Some(Sample {
            key,
            image: self.images.get(key)?,
            masks: self.masks.get(key)?,
            score: *score,
        })
    }

    pub fn samples(&self) -> impl Iterator<Item = Sample<'_>> {
        self.keys().filter_map(|key| self.sample(key))
    }

    pub fn into_parts(
        self,
    ) -> (
        IndexMap<String, DynamicImage>,
        IndexMap<String, MaskStack>,
        IndexMap<String, f64>,
    ) {
        (self.images, self.masks, self.scores)
    }
}

/// Loads every sample listed in `<base_dir>/scores.json`.
///
/// # Errors
///
/// The first failure aborts the load:
///
/// * [`Error::Io`] if `scores.json`, an image or a mask file cannot be read
///   ([`Error::is_not_found`] tells missing files apart);
/// * [`Error::Json`] if `scores.json` is not an object of numbers;
/// * [`Error::Image`] if an image cannot be decoded;
/// * [`Error::Npy`] if a mask file is not a rank-3 boolean or numeric NPY array.
pub fn load_dataset(base_dir: impl AsRef<Path>, layout: &DatasetLayout) -> Result<Dataset> {
    let base_dir = base_dir.as_ref();
    let scores = read_scores(&base_dir.join(SCORES_FILE))?;

    let mut images = IndexMap::with_capacity(scores.len());
    let mut masks = IndexMap::with_capacity(scores.len());
    for key in scores.keys() {
        let image = read_image(&layout.image_path(base_dir, key))?;
        let mask = read_masks(&layout.mask_path(base_dir, key))?;
        log::debug!(
            "loaded sample {key}: {}x{} image, {} masks",
            image.width(),
            image.height(),
            mask.len()
        );
        images.insert(key.clone(), image);
        masks.insert(key.clone(), mask);
    }

    log::info!("loaded {} samples from {}", scores.len(), base_dir.display());
    Ok(Dataset {
        images,
        masks,
        scores,
    })
}

/// Same as [`load_dataset`] with the extensions given directly.
pub fn get_images_masks_scores(
    base_dir: impl AsRef<Path>,
    mask_ext: &str,
    image_ext: &str,
) -> Result<Dataset> {
    let layout = DatasetLayout {
        mask_ext: mask_ext.to_string(),
        image_ext: image_ext.to_string(),
    };
    load_dataset(base_dir, &layout)
}

fn read_scores(path: &Path) -> Result<IndexMap<String, f64>> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn read_image(path: &Path) -> Result<DynamicImage> {
    let reader = ImageReader::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    reader
        .with_guessed_format()
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?
        .decode()
        .map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })
}

fn read_masks(path: &Path) -> Result<MaskStack> {
    let bytes = fs::read(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_mask_array(&bytes)
        .map(MaskStack::new)
        .map_err(|source| Error::Npy {
            path: path.to_path_buf(),
            source,
        })
}

type MaskParser = fn(&[u8]) -> Result<Array3<bool>, ReadNpyError>;

// Numeric dtypes accepted in place of bool, tried in order.
const COERCIBLE: [MaskParser; 10] = [
    parse_nonzero::<u8>,
    parse_nonzero::<i8>,
    parse_nonzero::<u16>,
    parse_nonzero::<i16>,
    parse_nonzero::<u32>,
    parse_nonzero::<i32>,
    parse_nonzero::<u64>,
    parse_nonzero::<i64>,
    parse_nonzero::<f32>,
    parse_nonzero::<f64>,
];

/// Parses an NPY buffer as a boolean array, falling back to any numeric dtype where
/// nonzero (including NaN) means covered.
fn parse_mask_array(bytes: &[u8]) -> Result<Array3<bool>, ReadNpyError> {
    let wrong_dtype = match Array3::<bool>::read_npy(bytes) {
        Err(err @ ReadNpyError::WrongDescriptor(_)) => err,
        other => return other,
    };

    for parse in COERCIBLE {
        match parse(bytes) {
            Err(ReadNpyError::WrongDescriptor(_)) => continue,
            other => return other,
        }
    }
    Err(wrong_dtype)
}

fn parse_nonzero<T>(bytes: &[u8]) -> Result<Array3<bool>, ReadNpyError>
where
    T: ReadableElement + Zero + PartialEq + Clone,
{
    Array3::<T>::read_npy(bytes).map(|array| array.mapv(|value| value != T::zero()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use ndarray::{Array3, array};
    use ndarray_npy::write_npy;
    use tempfile::TempDir;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new(scores: &str) -> Self {
            let dir = tempfile::tempdir().unwrap();
            fs::create_dir(dir.path().join(IMAGES_DIR)).unwrap();
            fs::create_dir(dir.path().join(MASKS_DIR)).unwrap();
            fs::write(dir.path().join(SCORES_FILE), scores).unwrap();
            Self { dir }
        }

        fn path(&self) -> &Path {
            self.dir.path()
        }

        fn add_image(&self, key: &str, image: &RgbImage) {
            image
                .save(self.path().join(IMAGES_DIR).join(format!("{key}.png")))
                .unwrap();
        }

        fn add_masks<A: ndarray_npy::WriteNpyExt>(&self, key: &str, masks: &A) {
            write_npy(self.path().join(MASKS_DIR).join(format!("{key}.npy")), masks).unwrap();
        }

        fn add_sample(&self, key: &str, num_masks: usize) {
            self.add_image(key, &RgbImage::from_pixel(3, 2, Rgb([1, 2, 3])));
            self.add_masks(key, &Array3::from_elem((num_masks, 2, 3), true));
        }
    }

    #[test]
    fn loads_single_sample_round_trip() {
        let fixture = Fixture::new(r#"{"a": 0.9}"#);
        let red = RgbImage::from_pixel(2, 2, Rgb([255, 0, 0]));
        fixture.add_image("a", &red);
        fixture.add_masks("a", &Array3::from_elem((1, 2, 2), true));

        let dataset = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.images()["a"].to_rgb8(), red);
        assert_eq!(dataset.masks()["a"].dim(), (1, 2, 2));
        assert!(dataset.masks()["a"].as_array().iter().all(|&m| m));
        assert_eq!(dataset.scores()["a"], 0.9);
    }

    #[test]
    fn maps_share_keys_in_json_order() {
        let fixture = Fixture::new(r#"{"zeta": 0.1, "alpha": 2, "mid": 0.75}"#);
        fixture.add_sample("zeta", 1);
        fixture.add_sample("alpha", 2);
        fixture.add_sample("mid", 3);

        let dataset = get_images_masks_scores(fixture.path(), ".npy", ".png").unwrap();

        let expected = ["zeta", "alpha", "mid"];
        assert_eq!(dataset.keys().collect::<Vec<_>>(), expected);
        assert!(dataset.images().keys().eq(expected.iter()));
        assert!(dataset.masks().keys().eq(expected.iter()));
        assert!(dataset.scores().keys().eq(expected.iter()));
        assert_eq!(dataset.masks()["alpha"].len(), 2);
        assert_eq!(dataset.scores()["alpha"], 2.0);

        let sample = dataset.sample("mid").unwrap();
        assert_eq!(sample.key, "mid");
        assert_eq!(sample.masks.len(), 3);
        assert_eq!(sample.score, 0.75);
        assert!(dataset.sample("missing").is_none());
        assert_eq!(dataset.samples().count(), 3);
    }

    #[test]
    fn empty_scores_give_empty_dataset() {
        let fixture = Fixture::new("{}");
        let dataset = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap();
        assert!(dataset.is_empty());
        let (images, masks, scores) = dataset.into_parts();
        assert!(images.is_empty() && masks.is_empty() && scores.is_empty());
    }

    #[test]
    fn missing_image_fails_instead_of_skipping() {
        let fixture = Fixture::new(r#"{"a": 0.9}"#);
        fixture.add_masks("a", &Array3::from_elem((1, 2, 2), true));

        let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();

        assert!(err.is_not_found(), "unexpected error: {err}");
        assert!(matches!(&err, Error::Io { path, .. } if path.ends_with("images/a.png")));
    }

    #[test]
    fn missing_mask_fails() {
        let fixture = Fixture::new(r#"{"a": 0.9, "b": 0.1}"#);
        fixture.add_sample("a", 1);
        fixture.add_image("b", &RgbImage::new(2, 2));

        let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();

        assert!(err.is_not_found());
        assert!(matches!(&err, Error::Io { path, .. } if path.ends_with("masks/b.npy")));
    }

    #[test]
    fn missing_scores_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_dataset(dir.path(), &DatasetLayout::default()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn malformed_scores_fail() {
        for scores in ["{not json", r#"{"a": "high"}"#, "[0.5]"] {
            let fixture = Fixture::new(scores);
            let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();
            assert!(matches!(err, Error::Json { .. }), "{scores}: {err}");
        }
    }

    #[test]
    fn custom_extensions_are_used() {
        let fixture = Fixture::new(r#"{"a": 1.0}"#);
        let image = RgbImage::from_pixel(2, 2, Rgb([0, 255, 0]));
        image
            .save_with_format(
                fixture.path().join(IMAGES_DIR).join("a.img"),
                image::ImageFormat::Png,
            )
            .unwrap();
        write_npy(
            fixture.path().join(MASKS_DIR).join("a.mask"),
            &Array3::from_elem((2, 2, 2), false),
        )
        .unwrap();

        let dataset = get_images_masks_scores(fixture.path(), ".mask", ".img").unwrap();

        assert_eq!(dataset.images()["a"].to_rgb8(), image);
        assert_eq!(dataset.masks()["a"].dim(), (2, 2, 2));
    }

    #[test]
    fn numeric_masks_are_coerced_to_bool() {
        let fixture = Fixture::new(r#"{"ints": 0.5, "floats": 0.5}"#);
        fixture.add_image("ints", &RgbImage::new(2, 1));
        fixture.add_image("floats", &RgbImage::new(2, 1));
        fixture.add_masks("ints", &array![[[0u8, 1]], [[255, 0]]]);
        fixture.add_masks("floats", &array![[[0.0f32, f32::NAN]]]);

        let dataset = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap();

        assert_eq!(
            dataset.masks()["ints"].as_array(),
            &array![[[false, true]], [[true, false]]]
        );
        assert_eq!(
            dataset.masks()["floats"].as_array(),
            &array![[[false, true]]]
        );
    }

    #[test]
    fn wide_numeric_masks_are_coerced_to_bool() {
        let fixture = Fixture::new(r#"{"labels": 0.5, "probs": 0.5}"#);
        fixture.add_image("labels", &RgbImage::new(3, 1));
        fixture.add_image("probs", &RgbImage::new(3, 1));
        fixture.add_masks("labels", &array![[[-1i64, 0, 7]]]);
        fixture.add_masks("probs", &array![[[0.0f64, -0.0, 0.25]]]);

        let dataset = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap();

        assert_eq!(
            dataset.masks()["labels"].as_array(),
            &array![[[true, false, true]]]
        );
        assert_eq!(
            dataset.masks()["probs"].as_array(),
            &array![[[false, false, true]]]
        );
    }

    #[test]
    fn wrong_rank_mask_fails() {
        let fixture = Fixture::new(r#"{"a": 0.5}"#);
        fixture.add_image("a", &RgbImage::new(2, 2));
        fixture.add_masks("a", &array![[true, false], [false, true]]);

        let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();

        assert!(matches!(err, Error::Npy { .. }), "unexpected error: {err}");
    }

    #[test]
    fn garbage_mask_file_fails() {
        let fixture = Fixture::new(r#"{"a": 0.5}"#);
        fixture.add_image("a", &RgbImage::new(2, 2));
        fs::write(fixture.path().join(MASKS_DIR).join("a.npy"), b"not an array").unwrap();

        let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();

        assert!(matches!(err, Error::Npy { .. }));
    }

    #[test]
    fn undecodable_image_fails() {
        let fixture = Fixture::new(r#"{"a": 0.5}"#);
        fs::write(fixture.path().join(IMAGES_DIR).join("a.png"), b"not a png").unwrap();
        fixture.add_masks("a", &Array3::from_elem((1, 2, 2), true));

        let err = load_dataset(fixture.path(), &DatasetLayout::default()).unwrap_err();

        assert!(matches!(err, Error::Image { .. }));
        assert!(!err.is_not_found());
    }
}
