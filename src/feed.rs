//! Synthetic ingest writer for development and demos.
//!
//! Stands in for the ingest service: appends sample lines to the session's
//! current hour bucket in the directory the viewer tails, creating each
//! bucket with its metadata header. Buckets roll over on the UTC hour, which
//! exercises the viewer's rotation handling. The waveform is a sine at a
//! configurable amplitude plus noise — not an ECG morphology, but enough to
//! verify calibration, pacing, and sweep behavior end to end.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use tracing::info;

use crate::error::AppResult;

/// Written once when a bucket file is created.
pub const FILE_HEADER: &str = "#device=feed-sim\n#cols=t_ms,adc,lead_off\n";

/// Milliseconds of samples written per block.
const BLOCK_MS: u64 = 100;

/// Knobs for the generator.
#[derive(Debug, Clone)]
pub struct FeedOptions {
    pub dir: PathBuf,
    pub session: String,
    pub sample_rate_hz: f64,
    pub signal_hz: f64,
    pub amplitude_mv: f64,
    pub noise_mv: f64,
    pub adc_bits: u32,
    pub vref: f64,
    /// Probability per block of a short lead-off burst
    pub lead_off_rate: f64,
    /// Stop after this long; `None` runs until interrupted
    pub duration_s: Option<f64>,
}

impl Default for FeedOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("./ecg_data"),
            session: "sim".to_string(),
            sample_rate_hz: 250.0,
            signal_hz: 1.0,
            amplitude_mv: 1.0,
            noise_mv: 0.05,
            adc_bits: 12,
            vref: 3.3,
            lead_off_rate: 0.01,
            duration_s: None,
        }
    }
}

/// Keep only the characters the ingest service allows in session IDs.
pub fn sanitize_session(session: &str) -> String {
    session
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'))
        .collect()
}

/// Bucket path for a session at a point in time: `{session}__{YYYYmmdd_HH}.csv`.
pub fn bucket_path(dir: &Path, session: &str, at: DateTime<Utc>) -> PathBuf {
    dir.join(format!(
        "{}__{}.csv",
        sanitize_session(session),
        at.format("%Y%m%d_%H")
    ))
}

/// Create the bucket with its header if absent or empty.
pub fn ensure_header(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let exists_with_content = fs::metadata(path).map(|m| m.len() > 0).unwrap_or(false);
    if !exists_with_content {
        fs::write(path, FILE_HEADER)?;
    }
    Ok(())
}

/// One synthetic ADC code: mid-rail sine plus noise, clamped to range.
pub fn synth_code(t_s: f64, opts: &FeedOptions, noise: f64) -> u32 {
    let mv = opts.amplitude_mv * (std::f64::consts::TAU * opts.signal_hz * t_s).sin() + noise;
    let full_scale = (1u64 << opts.adc_bits) as f64;
    let code = (mv / 1000.0 + opts.vref / 2.0) / opts.vref * full_scale;
    code.round().clamp(0.0, full_scale - 1.0) as u32
}

/// Run the generator until the duration elapses or the process is stopped.
pub fn run(opts: &FeedOptions) -> AppResult<()> {
    let block_len = ((opts.sample_rate_hz * BLOCK_MS as f64) / 1000.0).round().max(1.0) as usize;
    let period_ms = 1000.0 / opts.sample_rate_hz;
    let mut rng = rand::thread_rng();

    let started = Utc::now();
    let mut sample_index: u64 = 0;
    let mut current_path: Option<PathBuf> = None;

    info!(
        dir = %opts.dir.display(),
        session = %sanitize_session(&opts.session),
        rate = opts.sample_rate_hz,
        "feeding synthetic samples"
    );

    loop {
        let now = Utc::now();
        if let Some(limit) = opts.duration_s {
            let elapsed = (now - started).num_milliseconds() as f64 / 1000.0;
            if elapsed >= limit {
                return Ok(());
            }
        }

        let path = bucket_path(&opts.dir, &opts.session, now);
        if current_path.as_ref() != Some(&path) {
            ensure_header(&path)?;
            info!(path = %path.display(), "bucket");
            current_path = Some(path.clone());
        }

        let lead_off_block = rng.gen_bool(opts.lead_off_rate.clamp(0.0, 1.0));
        let mut block = String::new();
        for _ in 0..block_len {
            let t_s = sample_index as f64 * period_ms / 1000.0;
            let t_ms = started.timestamp_millis() + (sample_index as f64 * period_ms) as i64;
            let noise = if opts.noise_mv > 0.0 {
                rng.gen_range(-opts.noise_mv..=opts.noise_mv)
            } else {
                0.0
            };
            let code = synth_code(t_s, opts, noise);
            let lead_off = u8::from(lead_off_block);
            block.push_str(&format!("{t_ms},{code},{lead_off}\n"));
            sample_index += 1;
        }

        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(block.as_bytes())?;

        thread::sleep(Duration::from_millis(BLOCK_MS));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::parse;
    use chrono::TimeZone;

    #[test]
    fn test_sanitize_session() {
        assert_eq!(sanitize_session("S1a2b3c_9f8e7d"), "S1a2b3c_9f8e7d");
        assert_eq!(sanitize_session("../../etc/passwd"), "etcpasswd");
        assert_eq!(sanitize_session("dev ice-01"), "device-01");
    }

    #[test]
    fn test_bucket_path_format() {
        let at = Utc.with_ymd_and_hms(2025, 8, 26, 22, 15, 0).unwrap();
        let path = bucket_path(Path::new("/data"), "s1", at);
        assert_eq!(path, PathBuf::from("/data/s1__20250826_22.csv"));
    }

    #[test]
    fn test_ensure_header_writes_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("s1__20250826_22.csv");

        ensure_header(&path).unwrap();
        let first = fs::read_to_string(&path).unwrap();
        assert_eq!(first, FILE_HEADER);

        // appended data must survive a second call
        fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .unwrap()
            .write_all(b"1,2048,0\n")
            .unwrap();
        ensure_header(&path).unwrap();
        let second = fs::read_to_string(&path).unwrap();
        assert!(second.ends_with("1,2048,0\n"));
    }

    #[test]
    fn test_synth_code_stays_in_range() {
        let opts = FeedOptions::default();
        for i in 0..1000 {
            let code = synth_code(i as f64 / 250.0, &opts, 0.0);
            assert!(code < 1u32 << opts.adc_bits);
        }
        // amplitude beyond the rail clamps instead of wrapping
        let loud = FeedOptions {
            amplitude_mv: 10_000.0,
            ..FeedOptions::default()
        };
        assert_eq!(synth_code(0.25, &loud, 0.0), (1u32 << loud.adc_bits) - 1);
        assert_eq!(synth_code(0.75, &loud, 0.0), 0);
    }

    #[test]
    fn test_generated_lines_parse_back() {
        let opts = FeedOptions::default();
        let code = synth_code(0.1, &opts, 0.0);
        let line = format!("{},{},0", 1756159200123i64, code);
        let sample = parse::parse_line(&line).unwrap();
        assert_eq!(sample.raw, code);
        assert!(!sample.lead_off);
    }

    #[test]
    fn test_header_lines_are_ignored_by_parser() {
        for line in FILE_HEADER.lines() {
            assert_eq!(parse::parse_line(line), None);
        }
    }
}
