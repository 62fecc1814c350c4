//! End-to-end pipeline tests: bucket file in, rendered strip out.
//!
//! The frame loop is driven with explicit instants, so pacing behavior is
//! deterministic without real sleeps.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use std::time::{Duration, Instant};

use ecg_strip::config::Settings;
use ecg_strip::core::{CalibratedSample, TraceRenderer};
use ecg_strip::pipeline::FrameLoop;
use ecg_strip::render::{ScopeRenderer, StripRenderer};

const TAU: f64 = std::f64::consts::TAU;

fn append(path: &Path, data: &str) {
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    file.write_all(data.as_bytes()).unwrap();
}

fn settings_for(dir: &Path) -> Settings {
    let mut settings = Settings::default();
    settings.input.data_dir = dir.to_path_buf();
    settings.input.poll_interval_ms = 10;
    settings.signal.baseline_window_s = 0.0;
    settings
}

/// Rows of the trace overlay that hold ink.
fn inked_rows(renderer: &StripRenderer) -> (usize, usize) {
    let image = renderer.trace_image();
    let [width, height] = image.size;
    let mut min_row = height;
    let mut max_row = 0;
    for y in 0..height {
        for x in 0..width {
            if image.pixels[y * width + x] != egui::Color32::TRANSPARENT {
                min_row = min_row.min(y);
                max_row = max_row.max(y);
            }
        }
    }
    (min_row, max_row)
}

/// 10 s of a 1 Hz, 1 mV sine at 250 Hz, drawn at clinical defaults
/// (10 mm/mV, 4 px/mm, 25 mm/s): the trace must peak 40 px either side of
/// center and sweep 1000 px in total.
#[test]
fn test_sine_geometry_on_strip() {
    let settings = Settings::default();
    let mut renderer = StripRenderer::new(&settings.display, &settings.signal);

    for i in 0..2500 {
        let t_s = i as f64 / 250.0;
        renderer.draw_sample(&CalibratedSample {
            t_rel_s: t_s,
            millivolts: (TAU * t_s).sin(),
            lead_off: false,
        });
    }

    let center = settings.display.canvas_height_px / 2;
    let (min_row, max_row) = inked_rows(&renderer);
    assert!(
        (center - min_row) >= 39 && (center - min_row) <= 41,
        "upward excursion was {} px, expected ~40",
        center - min_row
    );
    assert!(
        (max_row - center) >= 39 && (max_row - center) <= 41,
        "downward excursion was {} px, expected ~40",
        max_row - center
    );

    let sweep = renderer.pen_x();
    assert!(
        (sweep as i64 - 1000).unsigned_abs() <= 1,
        "sweep was {sweep} px, expected ~1000"
    );
}

/// The full path: lines appended to a bucket file come out of the renderer
/// in order, paced, and swept at paper speed.
#[test]
fn test_file_to_strip_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim__20250826_22.csv");
    append(&path, "#device=feed-sim\n#cols=t_ms,adc,lead_off\n");

    let settings = settings_for(dir.path());
    let renderer = StripRenderer::new(&settings.display, &settings.signal);
    let t0 = Instant::now();
    let mut frame_loop = FrameLoop::new(&settings, renderer, t0);

    // bind at the live edge; the header must never replay
    frame_loop.tick(t0 + Duration::from_millis(20));
    assert_eq!(frame_loop.stats().rebinds, 1);
    assert_eq!(frame_loop.stats().lines_read, 0);

    // 2500 samples of a 4 mV sine as raw ADC codes around mid-rail
    let mut block = String::new();
    for i in 0..2500u32 {
        let mv = 4.0 * (TAU * i as f64 / 250.0).sin();
        let code = ((mv / 1000.0 + 1.65) / 3.3 * 4096.0).round() as u32;
        block.push_str(&format!("{},{},0\n", i * 4, code));
    }
    append(&path, &block);

    // a tick long after the last due time drains everything
    frame_loop.tick(t0 + Duration::from_secs(12));

    let stats = frame_loop.stats();
    assert_eq!(stats.lines_read, 2500);
    assert_eq!(stats.lines_skipped, 0);
    assert_eq!(stats.samples_released, 2500);

    let sweep = frame_loop.renderer().pen_x();
    assert!(
        (sweep as i64 - 1000).unsigned_abs() <= 2,
        "sweep was {sweep} px, expected ~1000"
    );

    // 4 mV at 40 px/mV, quantized to ~0.8 mV codes: well off center,
    // well inside the canvas
    let center = settings.display.canvas_height_px / 2;
    let (min_row, max_row) = inked_rows(frame_loop.renderer());
    let up = center - min_row;
    let down = max_row - center;
    assert!((120..=200).contains(&up), "upward excursion {up} px");
    assert!((120..=200).contains(&down), "downward excursion {down} px");
}

/// Samples released in one burst tick still arrive in order on the scope.
#[test]
fn test_file_to_scope_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim__20250826_22.csv");
    append(&path, "#cols=t_ms,adc,lead_off\n");

    let mut settings = settings_for(dir.path());
    settings.display.scope_window_s = 60.0;
    let t0 = Instant::now();
    let mut frame_loop = FrameLoop::new(&settings, ScopeRenderer::new(60.0), t0);

    frame_loop.tick(t0 + Duration::from_millis(20));

    let mut block = String::new();
    for i in 0..500u32 {
        // lead-off flagged for a stretch in the middle
        let lead_off = u8::from((200..250).contains(&i));
        block.push_str(&format!("{},{},{}\n", i * 4, 2048 + (i % 3), lead_off));
    }
    append(&path, &block);

    frame_loop.tick(t0 + Duration::from_secs(4));

    let points = frame_loop.renderer().points();
    assert_eq!(points.len(), 500);
    for pair in points.iter().collect::<Vec<_>>().windows(2) {
        assert!(pair[0][0] <= pair[1][0], "scope points out of order");
    }
    assert_eq!(frame_loop.renderer().lead_off_marks().len(), 50);
}

/// A renderer that stalls (slow host frame rate) loses nothing: samples wait
/// in the queue.
#[test]
fn test_slow_frames_lose_no_samples() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sim__20250826_22.csv");
    append(&path, "");

    let settings = settings_for(dir.path());
    let t0 = Instant::now();
    let mut frame_loop = FrameLoop::new(
        &settings,
        StripRenderer::new(&settings.display, &settings.signal),
        t0,
    );
    frame_loop.tick(t0 + Duration::from_millis(20));

    let mut block = String::new();
    for i in 0..500u32 {
        block.push_str(&format!("{},2048,0\n", i * 4));
    }
    append(&path, &block);

    // one tick per second instead of sixty: everything still comes through,
    // never faster than the sample rate allows
    let mut released_last = 0;
    for s in 1..=3 {
        let tick_at = t0 + Duration::from_millis(20) + Duration::from_secs(s);
        frame_loop.tick(tick_at);
        let released = frame_loop.stats().samples_released;
        assert!(released >= released_last);
        assert!(released as f64 <= s as f64 * 250.0 + 1.0);
        released_last = released;
    }
    assert_eq!(frame_loop.stats().samples_released, 500);
}
