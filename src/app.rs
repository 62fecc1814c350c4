//! The eframe/egui viewer applications.
//!
//! Two hosts around the same [`FrameLoop`] core: the paper-strip view blits
//! the renderer's grid and trace images as textures, the scope view draws an
//! `egui_plot` line. Presentation is capped via `request_repaint_after`;
//! pacing correctness never depends on the frame rate.

use std::time::{Duration, Instant};

use egui::{Color32, TextureHandle, TextureOptions};
use egui_plot::{Legend, Line, Plot, PlotBounds, PlotPoints, Points};

use crate::config::{RendererKind, Settings};
use crate::error::{AppResult, StripError};
use crate::pipeline::FrameLoop;
use crate::render::{ScopeRenderer, StripRenderer};

const HUD_COLOR: Color32 = Color32::from_rgb(40, 40, 40);
const CURSOR_COLOR: Color32 = Color32::from_rgb(50, 50, 50);

fn hud_line(settings: &Settings) -> String {
    format!(
        "{} mm/s   {} mm/mV   fs={} Hz",
        settings.display.paper_speed_mm_s,
        settings.display.gain_mm_per_mv,
        settings.signal.sample_rate_hz
    )
}

/// Launch the configured viewer and run until the window closes.
pub fn run(settings: Settings) -> AppResult<()> {
    let width = settings.display.canvas_width_px as f32;
    let height = settings.display.canvas_height_px as f32;
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([width, height])
            .with_title("ECG Strip"),
        ..Default::default()
    };

    let result = match settings.display.renderer {
        RendererKind::Strip => eframe::run_native(
            "ecg-strip",
            options,
            Box::new(move |_cc| Ok(Box::new(StripApp::new(settings)))),
        ),
        RendererKind::Scope => eframe::run_native(
            "ecg-strip",
            options,
            Box::new(move |_cc| Ok(Box::new(ScopeApp::new(settings)))),
        ),
    };
    result.map_err(|e| StripError::Display(e.to_string()))
}

/// Paper-strip presentation.
pub struct StripApp {
    frame_loop: FrameLoop<StripRenderer>,
    hud: String,
    frame_delay: Duration,
    grid_tex: Option<TextureHandle>,
    trace_tex: Option<TextureHandle>,
}

impl StripApp {
    pub fn new(settings: Settings) -> Self {
        let renderer = StripRenderer::new(&settings.display, &settings.signal);
        let frame_delay = Duration::from_secs_f64(1.0 / settings.display.target_fps);
        Self {
            frame_loop: FrameLoop::new(&settings, renderer, Instant::now()),
            hud: hud_line(&settings),
            frame_delay,
            grid_tex: None,
            trace_tex: None,
        }
    }
}

impl eframe::App for StripApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let tick = self.frame_loop.tick(Instant::now());

        let renderer = self.frame_loop.renderer();
        if self.grid_tex.is_none() {
            self.grid_tex = Some(ctx.load_texture(
                "strip_grid",
                renderer.grid_image().clone(),
                TextureOptions::NEAREST,
            ));
        }
        match &mut self.trace_tex {
            Some(tex) => tex.set(renderer.trace_image().clone(), TextureOptions::NEAREST),
            None => {
                self.trace_tex = Some(ctx.load_texture(
                    "strip_trace",
                    renderer.trace_image().clone(),
                    TextureOptions::NEAREST,
                ));
            }
        }
        let (Some(grid_tex), Some(trace_tex)) = (&self.grid_tex, &self.trace_tex) else {
            return;
        };
        let grid_id = grid_tex.id();
        let trace_id = trace_tex.id();

        let pen_x = renderer.pen_x() as f32;
        let size = egui::vec2(
            renderer.grid_image().size[0] as f32,
            renderer.grid_image().size[1] as f32,
        );

        egui::CentralPanel::default()
            .frame(egui::Frame::none())
            .show(ctx, |ui| {
                let (rect, _) = ui.allocate_exact_size(size, egui::Sense::hover());
                let painter = ui.painter_at(rect);
                let uv = egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0));
                painter.image(grid_id, rect, uv, Color32::WHITE);
                painter.image(trace_id, rect, uv, Color32::WHITE);

                // sweep cursor at the pen column
                let x = rect.left() + pen_x;
                painter.line_segment(
                    [egui::pos2(x, rect.top()), egui::pos2(x, rect.bottom())],
                    egui::Stroke::new(1.0, CURSOR_COLOR),
                );

                painter.text(
                    rect.left_top() + egui::vec2(10.0, 10.0),
                    egui::Align2::LEFT_TOP,
                    &self.hud,
                    egui::FontId::proportional(14.0),
                    HUD_COLOR,
                );
            });

        // idle ticks relax the cadence instead of spinning
        let delay = if tick.idle {
            self.frame_delay * 2
        } else {
            self.frame_delay
        };
        ctx.request_repaint_after(delay);
    }
}

/// Scrolling-window presentation.
pub struct ScopeApp {
    frame_loop: FrameLoop<ScopeRenderer>,
    hud: String,
    frame_delay: Duration,
}

impl ScopeApp {
    pub fn new(settings: Settings) -> Self {
        let renderer = ScopeRenderer::new(settings.display.scope_window_s);
        let frame_delay = Duration::from_secs_f64(1.0 / settings.display.target_fps);
        Self {
            frame_loop: FrameLoop::new(&settings, renderer, Instant::now()),
            hud: hud_line(&settings),
            frame_delay,
        }
    }
}

impl eframe::App for ScopeApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let tick = self.frame_loop.tick(Instant::now());
        let renderer = self.frame_loop.renderer();

        let window = renderer.window_s();
        let points = PlotPoints::from_iter(renderer.points().iter().copied());
        let marks = PlotPoints::from_iter(renderer.lead_off_marks().iter().copied());
        let latest_t = renderer.points().back().map(|p| p[0]);
        let value_range = renderer.value_range();

        egui::CentralPanel::default().show(ctx, |ui| {
            ui.heading(&self.hud);
            Plot::new("live_scope")
                .legend(Legend::default())
                .show(ui, |plot_ui| {
                    if let (Some(t_max), Some((v_min, v_max))) = (latest_t, value_range) {
                        let t_min = (t_max - window).max(0.0);
                        let t_max = t_max.max(window);
                        let margin = ((v_max - v_min) * 0.1).max(0.1);
                        plot_ui.set_plot_bounds(PlotBounds::from_min_max(
                            [t_min, v_min - margin],
                            [t_max, v_max + margin],
                        ));
                    }
                    plot_ui.line(Line::new(points).name("ECG (mV)"));
                    plot_ui.points(
                        Points::new(marks)
                            .color(Color32::RED)
                            .radius(2.5)
                            .name("Lead-off"),
                    );
                });
        });

        let delay = if tick.idle {
            self.frame_delay * 2
        } else {
            self.frame_delay
        };
        ctx.request_repaint_after(delay);
    }
}
