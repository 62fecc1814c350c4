//! Configuration management.
//!
//! Strongly-typed settings for the viewer, loaded from:
//! 1. a TOML file (`config/default.toml` unless overridden on the CLI)
//! 2. environment variables prefixed with `ECG_STRIP_`
//!
//! Every field has a default, so an absent file yields a runnable
//! configuration. Settings are fixed at process start; there is no hot
//! reload.
//!
//! # Example
//! ```no_run
//! use ecg_strip::config::Settings;
//!
//! # fn main() -> Result<(), ecg_strip::error::StripError> {
//! let settings = Settings::load_from("config/default.toml")?;
//! settings.validate()?;
//! # Ok(())
//! # }
//! ```

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppResult, StripError};

/// Top-level settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Settings {
    /// Application-level settings
    #[serde(default)]
    pub application: ApplicationSettings,
    /// Session file discovery and tailing
    #[serde(default)]
    pub input: InputSettings,
    /// Acquisition and calibration parameters
    #[serde(default)]
    pub signal: SignalSettings,
    /// Rendering parameters
    #[serde(default)]
    pub display: DisplaySettings,
    /// Sample release pacing
    #[serde(default)]
    pub pacing: PacingSettings,
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicationSettings {
    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Where the ingest service writes session bucket files, and how to tail them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    /// Directory holding `{session}__{hour}.{ext}` files
    pub data_dir: PathBuf,
    /// Follow only files of this session; `None` follows the newest of any session
    pub session_prefix: Option<String>,
    /// Bucket file extension
    pub file_ext: String,
    /// Upper bound on lines consumed per poll
    pub max_lines_per_poll: usize,
    /// Fallback poll interval in milliseconds when no filesystem event arrives
    pub poll_interval_ms: u64,
}

/// Acquisition-side parameters of the sensor stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalSettings {
    /// Nominal acquisition rate in Hz
    pub sample_rate_hz: f64,
    /// ADC resolution in bits
    pub adc_bits: u32,
    /// ADC reference voltage
    pub vref: f64,
    /// Trailing moving-average window for baseline removal, in seconds (0 disables)
    pub baseline_window_s: f64,
}

/// Rendering parameters, in clinical strip-chart units.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplaySettings {
    /// Which rendering variant to run
    pub renderer: RendererKind,
    /// Horizontal sweep rate in mm/s (25 or 50 are the clinical standards)
    pub paper_speed_mm_s: f64,
    /// Vertical scale in mm of deflection per mV
    pub gain_mm_per_mv: f64,
    /// Grid density in pixels per millimeter
    pub px_per_mm: u32,
    /// Canvas width in pixels
    pub canvas_width_px: usize,
    /// Canvas height in pixels
    pub canvas_height_px: usize,
    /// Presentation frame-rate cap
    pub target_fps: f64,
    /// How lead-off samples are treated
    pub lead_off: LeadOffPolicy,
    /// Visible time window of the scope renderer, in seconds
    pub scope_window_s: f64,
}

/// Pacing-queue behavior under backlog.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PacingSettings {
    /// Backlog bound in seconds of samples at the nominal rate; the oldest
    /// samples are dropped beyond this
    pub max_backlog_s: f64,
}

/// Rendering variant selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Clinical paper-strip trace with wrap-around sweep
    Strip,
    /// Simple scrolling-window plot
    Scope,
}

/// Treatment of samples flagged as lead-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadOffPolicy {
    /// Draw the raw trace in a distinct color while contact is lost
    Highlight,
    /// Flatten the sample to mid-scale instead of displaying sensor noise
    Flatten,
}

impl Default for ApplicationSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./ecg_data"),
            session_prefix: None,
            file_ext: "csv".to_string(),
            max_lines_per_poll: 4096,
            poll_interval_ms: 50,
        }
    }
}

impl Default for SignalSettings {
    fn default() -> Self {
        Self {
            sample_rate_hz: 250.0,
            adc_bits: 12,
            vref: 3.3,
            baseline_window_s: 0.6,
        }
    }
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            renderer: RendererKind::Strip,
            paper_speed_mm_s: 25.0,
            gain_mm_per_mv: 10.0,
            px_per_mm: 4,
            canvas_width_px: 1280,
            canvas_height_px: 480,
            target_fps: 60.0,
            lead_off: LeadOffPolicy::Highlight,
            scope_window_s: 10.0,
        }
    }
}

impl Default for PacingSettings {
    fn default() -> Self {
        Self { max_backlog_s: 30.0 }
    }
}

impl SignalSettings {
    /// Baseline window expressed in samples at the nominal rate.
    pub fn baseline_window(&self) -> usize {
        (self.baseline_window_s * self.sample_rate_hz).round() as usize
    }
}

impl Settings {
    /// Load configuration from the default file location and environment.
    ///
    /// Environment variables override file values with the `ECG_STRIP_`
    /// prefix, e.g. `ECG_STRIP_DISPLAY_RENDERER=scope`.
    pub fn load() -> AppResult<Self> {
        Self::load_from("config/default.toml")
    }

    /// Load configuration from a specific file path. A missing file is not
    /// an error; defaults apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> AppResult<Self> {
        let settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("ECG_STRIP_").split("_"))
            .extract()?;
        Ok(settings)
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> AppResult<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(StripError::Configuration(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            )));
        }

        if !(self.signal.sample_rate_hz > 0.0) {
            return Err(StripError::Configuration(format!(
                "Invalid sample_rate_hz {}. Must be positive",
                self.signal.sample_rate_hz
            )));
        }

        if !(1..=24).contains(&self.signal.adc_bits) {
            return Err(StripError::Configuration(format!(
                "Invalid adc_bits {}. Must be 1-24",
                self.signal.adc_bits
            )));
        }

        if !(self.signal.vref > 0.0) {
            return Err(StripError::Configuration(format!(
                "Invalid vref {}. Must be positive",
                self.signal.vref
            )));
        }

        if self.signal.baseline_window_s < 0.0 {
            return Err(StripError::Configuration(format!(
                "Invalid baseline_window_s {}. Must not be negative",
                self.signal.baseline_window_s
            )));
        }

        if !(self.display.paper_speed_mm_s > 0.0) || !(self.display.gain_mm_per_mv > 0.0) {
            return Err(StripError::Configuration(
                "paper_speed_mm_s and gain_mm_per_mv must be positive".to_string(),
            ));
        }

        if self.display.px_per_mm == 0 {
            return Err(StripError::Configuration(
                "px_per_mm must be at least 1".to_string(),
            ));
        }

        if self.display.canvas_width_px < 64 || self.display.canvas_height_px < 64 {
            return Err(StripError::Configuration(format!(
                "Canvas {}x{} too small. Both dimensions must be at least 64 px",
                self.display.canvas_width_px, self.display.canvas_height_px
            )));
        }

        if !(self.display.target_fps > 0.0) {
            return Err(StripError::Configuration(format!(
                "Invalid target_fps {}. Must be positive",
                self.display.target_fps
            )));
        }

        if !(self.display.scope_window_s > 0.0) {
            return Err(StripError::Configuration(format!(
                "Invalid scope_window_s {}. Must be positive",
                self.display.scope_window_s
            )));
        }

        if self.input.max_lines_per_poll == 0 {
            return Err(StripError::Configuration(
                "max_lines_per_poll must be at least 1".to_string(),
            ));
        }

        if !(self.pacing.max_backlog_s > 0.0) {
            return Err(StripError::Configuration(format!(
                "Invalid max_backlog_s {}. Must be positive",
                self.pacing.max_backlog_s
            )));
        }

        Ok(())
    }
}
