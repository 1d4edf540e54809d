use image::Rgba;
use palette::{Srgb, WithAlpha};

/// Opacity given to every mask overlay.
pub const OVERLAY_ALPHA: f32 = 0.5;

/// The Tableau 10 categorical palette, in matplotlib's order.
pub const TABLEAU_COLORS: [Srgb<u8>; 10] = [
    Srgb::new(0x1f, 0x77, 0xb4), // blue
    Srgb::new(0xff, 0x7f, 0x0e), // orange
    Srgb::new(0x2c, 0xa0, 0x2c), // green
    Srgb::new(0xd6, 0x27, 0x28), // red
    Srgb::new(0x94, 0x67, 0xbd), // purple
    Srgb::new(0x8c, 0x56, 0x4b), // brown
    Srgb::new(0xe3, 0x77, 0xc2), // pink
    Srgb::new(0x7f, 0x7f, 0x7f), // gray
    Srgb::new(0xbc, 0xbd, 0x22), // olive
    Srgb::new(0x17, 0xbe, 0xcf), // cyan
];

/// Returns the overlay color for the mask at `index` (0-based), cycling through
/// [`TABLEAU_COLORS`], with `alpha` in `0.0..=1.0` truncated to 8 bits.
pub fn mask_color(index: usize, alpha: f32) -> Rgba<u8> {
    let base = TABLEAU_COLORS[index % TABLEAU_COLORS.len()];
    let (red, green, blue, alpha) = base.with_alpha(alpha_to_u8(alpha)).into_components();
    Rgba([red, green, blue, alpha])
}

// Truncates rather than rounds, so 0.5 maps to 127.
fn alpha_to_u8(alpha: f32) -> u8 {
    (255.0 * alpha.clamp(0.0, 1.0)) as u8
}
