//! Clinical calibration grid.
//!
//! Standard strip-chart paper: a line every millimeter, every fifth line
//! emphasized. With the conventional 25 mm/s paper speed and 10 mm/mV gain,
//! one large division is 0.2 s horizontally and 0.5 mV vertically. The grid
//! is rendered once into an opaque image; the trace overlay scrolls above
//! it, so the grid never needs redrawing per sample.

use egui::{Color32, ColorImage};

/// Paper background tone.
pub const PAPER: Color32 = Color32::from_rgb(255, 245, 245);
/// 1 mm grid lines.
pub const LINE_THIN: Color32 = Color32::from_rgb(180, 60, 60);
/// 5 mm grid lines.
pub const LINE_BOLD: Color32 = Color32::from_rgb(160, 30, 30);

/// Render the calibration grid for the given canvas and density.
pub fn paper_grid(width: usize, height: usize, px_per_mm: usize) -> ColorImage {
    let mut image = ColorImage::new([width, height], PAPER);

    for x in (0..width).step_by(px_per_mm) {
        let color = if (x / px_per_mm) % 5 == 0 {
            LINE_BOLD
        } else {
            LINE_THIN
        };
        for y in 0..height {
            image.pixels[y * width + x] = color;
        }
    }

    for y in (0..height).step_by(px_per_mm) {
        let color = if (y / px_per_mm) % 5 == 0 {
            LINE_BOLD
        } else {
            LINE_THIN
        };
        for x in 0..width {
            image.pixels[y * width + x] = color;
        }
    }

    image
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grid_line_spacing() {
        let px_per_mm = 4;
        let width = 64;
        let image = paper_grid(width, 32, px_per_mm);
        // probe a row between horizontal grid lines
        let row = 2 * width;

        // origin lines are emphasized
        assert_eq!(image.pixels[0], LINE_BOLD);
        // 1 mm in: a thin vertical line
        assert_eq!(image.pixels[row + px_per_mm], LINE_THIN);
        // 5 mm in: emphasized again
        assert_eq!(image.pixels[row + 5 * px_per_mm], LINE_BOLD);
        // between lines: paper
        assert_eq!(image.pixels[row + px_per_mm / 2], PAPER);
    }

    #[test]
    fn test_horizontal_lines_span_width() {
        let image = paper_grid(64, 32, 4);
        let y = 4;
        for x in 0..64 {
            let px = image.pixels[y * 64 + x];
            assert!(px == LINE_THIN || px == LINE_BOLD);
        }
    }
}
