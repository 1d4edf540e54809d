use std::path::Path;

use image::{Rgba, RgbaImage, imageops};

use crate::error::{Error, Result};

/// Gap in pixels between neighbouring cells of an exported figure.
pub const PANEL_SPACING: u32 = 8;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// One cell of a [`Figure`].
#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Image { title: String, image: RgbaImage },
    /// An unused trailing cell, drawn as background only.
    Blank,
}

impl Panel {
    pub fn title(&self) -> Option<&str> {
        match self {
            Panel::Image { title, .. } => Some(title.as_str()),
            Panel::Blank => None,
        }
    }

    pub fn image(&self) -> Option<&RgbaImage> {
        match self {
            Panel::Image { image, .. } => Some(image),
            Panel::Blank => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Panel::Blank)
    }
}

/// A grid of panels in row-major order, as produced by
/// [`plot_masks_and_scores`](crate::overlay::plot_masks_and_scores).
///
/// Only the filled panels are stored. Cells after the last one are blank.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    rows: usize,
    cols: usize,
    panels: Vec<Panel>,
}

static BLANK: Panel = Panel::Blank;

impl Figure {
    /// Lays `panels` out over `cols` columns, leaving the rest of the last row blank.
    pub(crate) fn from_panels(panels: Vec<Panel>, cols: usize) -> Result<Self> {
        let invalid = Error::InvalidColumns { num_cols: cols };
        if cols == 0 {
            return Err(invalid);
        }
        let rows = panels.len().div_ceil(cols);
        if rows.checked_mul(cols).is_none() {
            return Err(invalid);
        }
        Ok(Self { rows, cols, panels })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// The filled panels, in order.
    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    /// Every cell of the grid in row-major order, blank ones included.
    pub fn cells(&self) -> impl ExactSizeIterator<Item = &Panel> {
        (0..self.rows * self.cols).map(|index| self.panels.get(index).unwrap_or(&BLANK))
    }

    pub fn panel(&self, row: usize, col: usize) -> Option<&Panel> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        Some(self.panels.get(row * self.cols + col).unwrap_or(&BLANK))
    }

    /// Titles of the non-blank panels, in order.
    pub fn titles(&self) -> Vec<&str> {
        self.panels.iter().filter_map(Panel::title).collect()
    }

    /// Tiles the panels into a single raster.
    ///
    /// Every cell is as large as the largest panel and panels are centered in their cells.
    /// Cells are separated by [`PANEL_SPACING`] pixels of white background. Titles are not
    /// drawn; read them from [`Figure::titles`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::FigureTooLarge`] if the raster would not fit in one image buffer.
    pub fn to_image(&self) -> Result<RgbaImage> {
        let (cell_width, cell_height) = self
            .panels
            .iter()
            .filter_map(Panel::image)
            .fold((0, 0), |(w, h), image| (w.max(image.width()), h.max(image.height())));

        let too_large = Error::FigureTooLarge {
            rows: self.rows,
            cols: self.cols,
        };
        let Some((width, height)) = self.canvas_size(cell_width, cell_height) else {
            return Err(too_large);
        };
        let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);

        for (index, panel) in self.panels.iter().enumerate() {
            let Some(image) = panel.image() else {
                continue;
            };
            // Both fit in u32 once the canvas size does.
            let row = (index / self.cols) as u32;
            let col = (index % self.cols) as u32;
            let cell_x = PANEL_SPACING + col * (cell_width + PANEL_SPACING);
            let cell_y = PANEL_SPACING + row * (cell_height + PANEL_SPACING);
            let x = cell_x + (cell_width - image.width()) / 2;
            let y = cell_y + (cell_height - image.height()) / 2;
            imageops::replace(&mut canvas, image, i64::from(x), i64::from(y));
        }

        Ok(canvas)
    }

    fn canvas_size(&self, cell_width: u32, cell_height: u32) -> Option<(u32, u32)> {
        let extent = |cells: usize, cell: u32| -> Option<u32> {
            let cells = u32::try_from(cells).ok()?;
            let gutters = cells.checked_add(1)?.checked_mul(PANEL_SPACING)?;
            cells.checked_mul(cell)?.checked_add(gutters)
        };
        let width = extent(self.cols, cell_width)?;
        let height = extent(self.rows, cell_height)?;

        // 4 bytes per RGBA pixel.
        let bytes = u64::from(width)
            .checked_mul(u64::from(height))?
            .checked_mul(4)?;
        usize::try_from(bytes).ok()?;
        Some((width, height))
    }

    /// Writes [`Figure::to_image`] to `path`, in the format implied by its extension.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.to_image()?.save(path).map_err(|source| Error::Image {
            path: path.to_path_buf(),
            source,
        })
    }
}
