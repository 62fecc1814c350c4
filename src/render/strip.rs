//! Clinical paper-strip trace rendering.
//!
//! The trace lives on a transparent overlay above the calibration grid. A
//! pen advances left to right at the configured paper speed, wrapping to
//! column 0 at the canvas edge and overwriting the oldest trace — classic
//! oscilloscope sweep. Each column is erased the moment the pen re-enters
//! it, so no fragments of the previous pass linger ahead of the pen.
//!
//! The per-sample advance `paper_speed * px_per_mm / sample_rate` is
//! generally fractional (0.4 px at the clinical defaults). The fractional
//! part accumulates and only whole pixels are stepped, so the long-run sweep
//! speed is exact even though individual steps round down.

use egui::{Color32, ColorImage};

use crate::config::{DisplaySettings, LeadOffPolicy, SignalSettings};
use crate::core::{CalibratedSample, TraceRenderer};

use super::grid;

/// Trace ink.
pub const TRACE: Color32 = Color32::BLACK;
/// Trace ink while the electrode reports lost contact.
pub const TRACE_LEAD_OFF: Color32 = Color32::from_rgb(200, 0, 0);

/// Renders released samples onto a wrap-around strip.
pub struct StripRenderer {
    grid: ColorImage,
    trace: ColorImage,
    width: usize,
    height: usize,
    pen_x: usize,
    last_y: usize,
    acc_x: f64,
    advance: f64,
    px_per_mv: f64,
    center_y: usize,
    highlight_lead_off: bool,
}

impl StripRenderer {
    pub fn new(display: &DisplaySettings, signal: &SignalSettings) -> Self {
        let width = display.canvas_width_px;
        let height = display.canvas_height_px;
        let px_per_mm = display.px_per_mm as f64;
        let center_y = height / 2;
        Self {
            grid: grid::paper_grid(width, height, display.px_per_mm as usize),
            trace: ColorImage::new([width, height], Color32::TRANSPARENT),
            width,
            height,
            pen_x: 0,
            last_y: center_y,
            acc_x: 0.0,
            advance: display.paper_speed_mm_s * px_per_mm / signal.sample_rate_hz,
            px_per_mv: display.gain_mm_per_mv * px_per_mm,
            center_y,
            highlight_lead_off: display.lead_off == LeadOffPolicy::Highlight,
        }
    }

    /// The static calibration grid; upload once.
    pub fn grid_image(&self) -> &ColorImage {
        &self.grid
    }

    /// The trace overlay; upload per presented frame.
    pub fn trace_image(&self) -> &ColorImage {
        &self.trace
    }

    /// Current pen column, for drawing the sweep cursor.
    pub fn pen_x(&self) -> usize {
        self.pen_x
    }

    fn y_for(&self, millivolts: f64) -> usize {
        let y = self.center_y as f64 - millivolts * self.px_per_mv;
        y.round().clamp(0.0, (self.height - 1) as f64) as usize
    }

    fn clear_column(&mut self, x: usize) {
        for y in 0..self.height {
            self.trace.pixels[y * self.width + x] = Color32::TRANSPARENT;
        }
    }

    fn draw_vspan(&mut self, x: usize, y0: usize, y1: usize, color: Color32) {
        let (top, bottom) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        for y in top..=bottom {
            self.trace.pixels[y * self.width + x] = color;
        }
    }
}

impl TraceRenderer for StripRenderer {
    fn draw_sample(&mut self, sample: &CalibratedSample) {
        self.acc_x += self.advance;
        let step = self.acc_x as usize;
        self.acc_x -= step as f64;

        let y = self.y_for(sample.millivolts);
        let color = if sample.lead_off && self.highlight_lead_off {
            TRACE_LEAD_OFF
        } else {
            TRACE
        };

        if step == 0 {
            // sub-pixel advance: the pen stays in its column
            self.draw_vspan(self.pen_x, self.last_y, y, color);
        } else {
            let mut prev_y = self.last_y;
            for i in 1..=step {
                let x = (self.pen_x + i) % self.width;
                self.clear_column(x);
                let frac = i as f64 / step as f64;
                let yi =
                    (self.last_y as f64 + (y as f64 - self.last_y as f64) * frac).round() as usize;
                self.draw_vspan(x, prev_y, yi, color);
                prev_y = yi;
            }
            self.pen_x = (self.pen_x + step) % self.width;
        }
        self.last_y = y;
    }

    fn present_frame(&mut self) {}
}
