use image::{DynamicImage, Pixel, Rgba, RgbaImage};
use ndarray::ArrayView2;

use crate::{
    colors::{OVERLAY_ALPHA, mask_color},
    error::{Error, Result},
    figure::{Figure, Panel},
    mask::MaskStack,
};

/// Number of grid columns used when the caller has no preference.
pub const DEFAULT_NUM_COLS: usize = 3;

/// Draws every mask of `masks` over its own copy of `image` and lays the results out
/// in a grid.
///
/// The first panel shows the original image, titled `"Original Image"`. Panel `i`
/// (1-based) shows mask `i - 1` composited over the image with a half-transparent color
/// taken cyclically from [`TABLEAU_COLORS`](crate::colors::TABLEAU_COLORS), titled
/// `"Mask {i}"`, or `"Mask {i}, Score = {score}"` when `scores` is given.
///
/// The grid has `num_cols` columns and `ceil((masks.len() + 1) / num_cols)` rows; cells
/// past the last panel are [`Panel::Blank`] (see [`Figure::cells`]).
///
/// `scores` holds one score per mask. Extra scores are ignored.
///
/// # Errors
///
/// * [`Error::InvalidColumns`] if `num_cols` is zero or too large to lay out.
/// * [`Error::ShapeMismatch`] if a mask's `(height, width)` differs from the image's.
/// * [`Error::MissingScore`] if `scores` has fewer entries than there are masks.
///
/// # Examples
///
/// ```
/// use image::{DynamicImage, Rgb, RgbImage};
/// use mask_overlay_utils::{MaskStack, overlay::plot_masks_and_scores};
/// use ndarray::Array3;
///
/// let image = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([0, 0, 0])));
/// let masks = MaskStack::new(Array3::from_elem((3, 4, 4), true));
///
/// let scores = [0.9, 0.5, 0.1];
/// let figure = plot_masks_and_scores(&image, &masks, Some(&scores[..]), 3).unwrap();
///
/// assert_eq!((figure.rows(), figure.cols()), (2, 3));
/// assert_eq!(figure.titles()[1], "Mask 1, Score = 0.9");
/// ```
pub fn plot_masks_and_scores(
    image: &DynamicImage,
    masks: &MaskStack,
    scores: Option<&[f64]>,
    num_cols: usize,
) -> Result<Figure> {
    if num_cols == 0 {
        return Err(Error::InvalidColumns { num_cols });
    }

    let base = image.to_rgba8();
    let mut panels = Vec::with_capacity(masks.len() + 1);
    panels.push(Panel::Image {
        title: "Original Image".to_string(),
        image: base.clone(),
    });

    for (index, mask) in masks.iter().enumerate() {
        check_shape(index, mask, &base)?;
        let image = paint_mask(&base, mask, mask_color(index, OVERLAY_ALPHA));

        let mut title = format!("Mask {}", index + 1);
        if let Some(scores) = scores {
            let score = scores.get(index).ok_or(Error::MissingScore {
                index,
                available: scores.len(),
            })?;
            title.push_str(&format!(", Score = {score}"));
        }

        log::debug!("{title}: {} pixels covered", masks.area(index).unwrap_or_default());

        panels.push(Panel::Image { title, image });
    }

    Figure::from_panels(panels, num_cols)
}

/// Composites `mask` onto a copy of `base`, painting covered pixels with `color`.
///
/// A transparent overlay the size of `base` is filled with `color` wherever `mask` is
/// `true` and then blended onto the copy with [`alpha_composite`].
///
/// # Errors
///
/// Returns [`Error::ShapeMismatch`] with `index` 0 if `mask` is not `height x width`
/// of `base`.
pub fn overlay_mask(
    base: &RgbaImage,
    mask: ArrayView2<'_, bool>,
    color: Rgba<u8>,
) -> Result<RgbaImage> {
    check_shape(0, mask, base)?;
    Ok(paint_mask(base, mask, color))
}

// `mask` must already match the size of `base`.
fn paint_mask(base: &RgbaImage, mask: ArrayView2<'_, bool>, color: Rgba<u8>) -> RgbaImage {
    let (image_width, image_height) = base.dimensions();

    let mut overlay = RgbaImage::new(image_width, image_height);
    for ((y, x), _) in mask.indexed_iter().filter(|&(_, &covered)| covered) {
        overlay.put_pixel(x as u32, y as u32, color);
    }

    let mut composited = base.clone();
    alpha_composite(&mut composited, &overlay);
    composited
}

fn check_shape(index: usize, mask: ArrayView2<'_, bool>, base: &RgbaImage) -> Result<()> {
    let (mask_height, mask_width) = mask.dim();
    let (image_height, image_width) = (base.height() as usize, base.width() as usize);
    if (mask_height, mask_width) != (image_height, image_width) {
        return Err(Error::ShapeMismatch {
            index,
            mask_height,
            mask_width,
            image_height,
            image_width,
        });
    }
    Ok(())
}

/// Blends `overlay` onto `base` in place with the "over" operator.
///
/// Overlay pixels with zero alpha leave the base pixel untouched. Both images must have
/// the same dimensions; pixels of `overlay` outside `base` are ignored.
pub fn alpha_composite(base: &mut RgbaImage, overlay: &RgbaImage) {
    for (x, y, top) in overlay.enumerate_pixels() {
        if top[3] == 0 || x >= base.width() || y >= base.height() {
            continue;
        }
        base.get_pixel_mut(x, y).blend(top);
    }
}
