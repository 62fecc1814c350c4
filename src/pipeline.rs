//! The frame loop core: poll, decode, pace, draw.
//!
//! One cooperative control flow owns every mutable stage — tail state,
//! calibration history, pacing queue, renderer — so no locking is needed.
//! Polling and presentation run at independent cadences: the watcher decides
//! when the tailer polls, the pacing queue decides when samples release, and
//! the host decides how often `tick` runs. A slow frame rate delays
//! presentation but never loses or reorders samples; they simply remain
//! queued.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::Settings;
use crate::core::TraceRenderer;
use crate::data::calibrate::Calibrator;
use crate::data::pacing::PacingQueue;
use crate::data::parse;
use crate::tail::{DirWatcher, SessionFileLocator, TailReader};

/// Running totals, surfaced for logging and the HUD.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoopStats {
    pub lines_read: u64,
    pub lines_skipped: u64,
    pub samples_released: u64,
    pub rebinds: u64,
}

/// What one tick did.
#[derive(Clone, Copy, Debug)]
pub struct Tick {
    /// At least one sample was drawn
    pub drew: bool,
    /// Nothing due and nothing pending; the host may relax its cadence
    pub idle: bool,
}

/// Orchestrates the tail-decode-pace-render pipeline around a renderer.
pub struct FrameLoop<R: TraceRenderer> {
    tail: TailReader,
    watcher: DirWatcher,
    calibrator: Calibrator,
    queue: PacingQueue,
    renderer: R,
    stats: LoopStats,
    reported_drops: u64,
}

impl<R: TraceRenderer> FrameLoop<R> {
    pub fn new(settings: &Settings, renderer: R, now: Instant) -> Self {
        let locator = SessionFileLocator::new(
            settings.input.data_dir.clone(),
            settings.input.session_prefix.as_deref(),
            &settings.input.file_ext,
        );
        let watcher = DirWatcher::new(
            &settings.input.data_dir,
            Duration::from_millis(settings.input.poll_interval_ms),
            now,
        );
        Self {
            tail: TailReader::new(locator, settings.input.max_lines_per_poll),
            watcher,
            calibrator: Calibrator::new(&settings.signal, settings.display.lead_off),
            queue: PacingQueue::new(
                settings.signal.sample_rate_hz,
                settings.pacing.max_backlog_s,
                now,
            ),
            renderer,
            stats: LoopStats::default(),
            reported_drops: 0,
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Run one iteration at time `now`: ingest any newly appended lines,
    /// then release and draw every sample whose due time has passed.
    pub fn tick(&mut self, now: Instant) -> Tick {
        if self.watcher.poll_due(now) {
            self.poll_input();
        }

        let mut drew = false;
        while let Some(sample) = self.queue.pop_due(now) {
            self.renderer.draw_sample(&sample);
            self.stats.samples_released += 1;
            drew = true;
        }
        self.renderer.present_frame();

        Tick {
            drew,
            idle: !drew && self.queue.is_empty(),
        }
    }

    fn poll_input(&mut self) {
        let poll = match self.tail.read_new() {
            Ok(poll) => poll,
            Err(e) => {
                // transient: the file may be mid-rotation or briefly locked
                debug!(error = %e, "tail poll failed, retrying next poll");
                return;
            }
        };

        if poll.rebound {
            self.calibrator.reset();
            self.stats.rebinds += 1;
        }

        for line in &poll.lines {
            self.stats.lines_read += 1;
            match parse::parse_line(line) {
                Some(sample) => self.queue.push(self.calibrator.calibrate(&sample)),
                None => self.stats.lines_skipped += 1,
            }
        }

        let dropped = self.queue.dropped();
        if dropped > self.reported_drops {
            warn!(
                dropped = dropped - self.reported_drops,
                backlog = self.queue.len(),
                "pacing backlog overflow, oldest samples discarded"
            );
            self.reported_drops = dropped;
        }
    }
}
