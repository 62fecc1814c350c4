//! Core data types and the rendering seam.
use serde::{Deserialize, Serialize};

/// A single decoded sample from the ingest stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Acquisition timestamp in milliseconds, as stamped by the sensor
    pub t_ms: i64,
    /// Raw ADC code, in `[0, 2^bits - 1]`
    pub raw: u32,
    /// True while the electrode has lost skin contact
    pub lead_off: bool,
}

/// A sample converted to physical units, ready to draw.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CalibratedSample {
    /// Seconds since the first sample of the currently followed file
    pub t_rel_s: f64,
    /// Calibrated, baseline-corrected signal in millivolts
    pub millivolts: f64,
    /// Carried through from the raw sample
    pub lead_off: bool,
}

/// Trait for a trace presentation style.
///
/// Both the clinical paper-strip renderer and the simpler scrolling-window
/// plot implement this, so they share the tail/decode/pacing core instead of
/// duplicating it. `draw_sample` is called once per released sample, in
/// strict arrival order; `present_frame` marks a frame boundary and is called
/// once per loop tick.
pub trait TraceRenderer {
    fn draw_sample(&mut self, sample: &CalibratedSample);
    fn present_frame(&mut self);
}
