// src/viewer/traces.rs

use colored::Colorize;
use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};
use std::sync::Arc;
use std::time::Duration;

use super::ControlFlags;
use crate::buffers::traces::SharedTraces;
use crate::config::Config;

/// Rolling trace grid: one miniature plot per channel in the current window,
/// a start-channel slider, and Start/Pause/Quit controls.
pub struct TraceGridWindow {
    store: SharedTraces,
    flags: Arc<ControlFlags>,
    num_channels: usize,
    window_size: usize,
    grid_rows: usize,
    grid_cols: usize,
    start_channel: usize,
    repaint_interval: Duration,
}

impl TraceGridWindow {
    pub fn new(store: SharedTraces, flags: Arc<ControlFlags>, config: &Config) -> Self {
        Self {
            store,
            flags,
            num_channels: config.traces.num_channels,
            window_size: config.traces.window_size,
            grid_rows: config.traces.grid_rows,
            grid_cols: config.traces.grid_cols,
            start_channel: 0,
            repaint_interval: Duration::from_millis(config.viewer.repaint_interval_ms),
        }
    }

    pub fn run(
        store: SharedTraces,
        flags: Arc<ControlFlags>,
        config: &Config,
    ) -> Result<(), eframe::Error> {
        let options = eframe::NativeOptions {
            viewport: egui::ViewportBuilder::default()
                .with_inner_size([
                    config.viewer.window_width as f32,
                    config.viewer.window_height as f32,
                ])
                .with_title("Probe Scope - Traces"),
            ..Default::default()
        };

        let app = TraceGridWindow::new(store, flags, config);
        eframe::run_native(
            "Probe Scope - Traces",
            options,
            Box::new(|_cc| Ok(Box::new(app))),
        )
    }

    fn controls(&mut self, ui: &mut egui::Ui) {
        let max_start = self.num_channels.saturating_sub(self.window_size);

        ui.horizontal(|ui| {
            let slider = ui.add(
                egui::Slider::new(&mut self.start_channel, 0..=max_start)
                    .step_by(1.0)
                    .text("Start Channel"),
            );
            if slider.changed() {
                println!(
                    "{}",
                    format!(
                        "Updated channels: {}-{}",
                        self.start_channel,
                        self.start_channel + self.window_size - 1
                    )
                    .green()
                );
            }

            ui.separator();

            if ui.button("Start").clicked() {
                self.flags.resume();
                println!("{}", "Plotting resumed.".green());
            }
            if ui.button("Pause").clicked() {
                self.flags.pause();
                println!("{}", "Plotting paused.".yellow());
            }
            if ui.button("Quit").clicked() {
                self.flags.stop();
                println!("{}", "Viewer closing.".red());
                ui.ctx().send_viewport_cmd(egui::ViewportCommand::Close);
            }

            ui.separator();
            if self.flags.is_paused() {
                ui.label(egui::RichText::new("paused").color(egui::Color32::YELLOW));
            } else {
                ui.label(egui::RichText::new("live").color(egui::Color32::LIGHT_GREEN));
            }
        });
    }

    fn trace_grid(&self, ui: &mut egui::Ui) {
        let spacing = ui.spacing().item_spacing;
        let cell_w = (ui.available_width() - spacing.x * (self.grid_cols as f32 - 1.0))
            / self.grid_cols as f32;
        let cell_h = (ui.available_height() - spacing.y * (self.grid_rows as f32 - 1.0))
            / self.grid_rows as f32;
        // leave room for the channel label above each plot
        let plot_h = (cell_h - 18.0).max(20.0);

        let store = self.store.lock().unwrap();

        for row in 0..self.grid_rows {
            ui.horizontal(|ui| {
                for col in 0..self.grid_cols {
                    let i = row * self.grid_cols + col;
                    if i >= self.window_size {
                        continue;
                    }
                    let channel = self.start_channel + i;

                    ui.allocate_ui(egui::vec2(cell_w, cell_h), |ui| {
                        ui.vertical(|ui| {
                            ui.small(format!("Ch {}", channel));
                            if let Some(samples) = store.row(channel) {
                                let line = Line::new(PlotPoints::from_ys_f32(samples))
                                    .color(egui::Color32::LIGHT_BLUE)
                                    .width(1.0);

                                Plot::new(("trace", channel))
                                    .width(cell_w)
                                    .height(plot_h)
                                    .show_axes([false, false])
                                    .show_grid([false, false])
                                    .allow_zoom(false)
                                    .allow_drag(false)
                                    .allow_scroll(false)
                                    .show(ui, |plot_ui| {
                                        plot_ui.line(line);
                                    });
                            }
                        });
                    });
                }
            });
        }
    }
}

impl eframe::App for TraceGridWindow {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        ctx.request_repaint_after(self.repaint_interval);

        if ctx.input(|i| i.viewport().close_requested()) {
            self.flags.stop();
        }

        egui::TopBottomPanel::bottom("trace_controls").show(ctx, |ui| {
            self.controls(ui);
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.trace_grid(ui);
        });
    }
}
