//! Raw-code calibration and baseline removal.
//!
//! The sensor front-end is AC-coupled around mid-rail, so the mid-scale ADC
//! code maps to roughly 0 mV. Slow baseline wander is removed with a
//! trailing moving average over a fixed-capacity ring buffer carrying a
//! running sum, giving O(1) updates per sample.

use ringbuf::{HeapRb, Rb};

use crate::config::{LeadOffPolicy, SignalSettings};
use crate::core::{CalibratedSample, Sample};

/// Convert a raw ADC code to millivolts around the mid-rail center.
pub fn raw_to_mv(raw: u32, bits: u32, vref: f64) -> f64 {
    let full_scale = (1u64 << bits) as f64;
    let volts = raw as f64 / full_scale * vref;
    (volts - vref / 2.0) * 1000.0
}

/// The mid-scale code for the given resolution.
pub fn mid_scale_code(bits: u32) -> u32 {
    1 << (bits - 1)
}

/// Trailing moving-average baseline remover.
///
/// A window of one sample or less is the identity transform. While the
/// window is still filling, the mean uses the current element count rather
/// than the nominal window size, so early samples are not over-corrected.
pub struct BaselineFilter {
    window: usize,
    ring: Option<HeapRb<f64>>,
    filled: usize,
    sum: f64,
}

impl BaselineFilter {
    pub fn new(window: usize) -> Self {
        Self {
            window,
            ring: (window > 1).then(|| HeapRb::new(window)),
            filled: 0,
            sum: 0.0,
        }
    }

    /// Window sized from a duration at the nominal sample rate.
    pub fn from_duration(window_s: f64, sample_rate_hz: f64) -> Self {
        Self::new((window_s * sample_rate_hz).round() as usize)
    }

    /// Feed one value, returning it with the trailing mean subtracted.
    pub fn step(&mut self, mv: f64) -> f64 {
        let Some(ring) = &mut self.ring else {
            return mv;
        };
        if let Some(evicted) = ring.push_overwrite(mv) {
            self.sum -= evicted;
        } else {
            self.filled += 1;
        }
        self.sum += mv;
        mv - self.sum / self.filled as f64
    }

    /// Forget all history, e.g. after a file rotation.
    pub fn reset(&mut self) {
        self.ring = (self.window > 1).then(|| HeapRb::new(self.window));
        self.filled = 0;
        self.sum = 0.0;
    }
}

/// Full calibration stage: lead-off policy, unit conversion, baseline
/// removal, and the relative-time epoch.
pub struct Calibrator {
    bits: u32,
    vref: f64,
    flatten_lead_off: bool,
    baseline: BaselineFilter,
    epoch_ms: Option<i64>,
}

impl Calibrator {
    pub fn new(signal: &SignalSettings, policy: LeadOffPolicy) -> Self {
        Self {
            bits: signal.adc_bits,
            vref: signal.vref,
            flatten_lead_off: policy == LeadOffPolicy::Flatten,
            baseline: BaselineFilter::new(signal.baseline_window()),
            epoch_ms: None,
        }
    }

    /// Calibrate one decoded sample.
    pub fn calibrate(&mut self, sample: &Sample) -> CalibratedSample {
        let raw = if self.flatten_lead_off && sample.lead_off {
            mid_scale_code(self.bits)
        } else {
            sample.raw
        };
        let millivolts = self.baseline.step(raw_to_mv(raw, self.bits, self.vref));
        let epoch = *self.epoch_ms.get_or_insert(sample.t_ms);
        CalibratedSample {
            t_rel_s: (sample.t_ms - epoch) as f64 / 1000.0,
            millivolts,
            lead_off: sample.lead_off,
        }
    }

    /// Restart the epoch and baseline history, e.g. after a file rotation.
    pub fn reset(&mut self) {
        self.baseline.reset();
        self.epoch_ms = None;
    }
}
