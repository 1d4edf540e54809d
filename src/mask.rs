use ndarray::{Array2, Array3, ArrayView2, Axis, ShapeError};

/// An ordered stack of boolean masks of shape `(num_objects, height, width)`.
///
/// The position of a mask in the stack is its object index: it decides the panel it is
/// drawn in and the color it is drawn with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaskStack(Array3<bool>);

impl MaskStack {
    pub fn new(masks: Array3<bool>) -> Self {
        Self(masks)
    }

    /// Stacks 2-D masks along a new leading axis.
    ///
    /// Fails if the masks do not all share the same shape, or if `masks` is empty.
    pub fn from_masks(masks: &[Array2<bool>]) -> Result<Self, ShapeError> {
        let views: Vec<ArrayView2<'_, bool>> = masks.iter().map(|m| m.view()).collect();
        ndarray::stack(Axis(0), &views).map(Self)
    }

    /// Number of masks in the stack.
    pub fn len(&self) -> usize {
        self.0.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        self.0.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.0.len_of(Axis(2))
    }

    /// `(num_objects, height, width)`
    pub fn dim(&self) -> (usize, usize, usize) {
        self.0.dim()
    }

    pub fn mask(&self, index: usize) -> Option<ArrayView2<'_, bool>> {
        (index < self.len()).then(|| self.0.index_axis(Axis(0), index))
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = ArrayView2<'_, bool>> {
        self.0.outer_iter()
    }

    /// Number of pixels covered by the mask at `index`.
    pub fn area(&self, index: usize) -> Option<usize> {
        self.mask(index)
            .map(|mask| mask.iter().filter(|&&covered| covered).count())
    }

    pub fn as_array(&self) -> &Array3<bool> {
        &self.0
    }

    pub fn into_inner(self) -> Array3<bool> {
        self.0
    }
}

impl From<Array3<bool>> for MaskStack {
    fn from(masks: Array3<bool>) -> Self {
        Self::new(masks)
    }
}
