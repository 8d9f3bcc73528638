use egui::{Color32, Context, RichText};

use crate::error::ViewerError;
use crate::ui::theme::*;

pub struct OverlayStats {
    pub surface_segments: u32,
    pub marker_segments: u32,
}

pub fn draw_help_overlay(ctx: &Context, stats: &OverlayStats) {
    egui::Area::new(egui::Id::new("help_overlay"))
        .anchor(egui::Align2::LEFT_BOTTOM, egui::vec2(12.0, -12.0))
        .show(ctx, |ui| {
            egui::Frame::default()
                .fill(Color32::from_black_alpha(180))
                .rounding(6.0)
                .inner_margin(10.0)
                .show(ui, |ui| {
                    ui.style_mut().override_font_id =
                        Some(egui::FontId::new(11.0, egui::FontFamily::Monospace));
                    ui.label(
                        RichText::new("LMB+Drag - Rotate | R - Reset | Esc - Quit")
                            .color(TEXT_MUTED),
                    );
                    ui.label(
                        RichText::new(format!(
                            "Surface: {} segments | Markers: {}",
                            fmt_num(stats.surface_segments as usize),
                            stats.marker_segments
                        ))
                        .color(TEXT_MUTED),
                    );
                });
        });
}

/// Shown instead of the scene when initialization failed.
pub fn draw_error_panel(ctx: &Context, error: &ViewerError) {
    egui::CentralPanel::default().show(ctx, |ui| {
        ui.add_space(16.0);
        ui.label(
            RichText::new("Sorry, could not initialize the graphics context")
                .color(TEXT_BRIGHT)
                .size(18.0)
                .strong(),
        );
        ui.add_space(8.0);
        egui::ScrollArea::vertical().show(ui, |ui| {
            ui.label(RichText::new(error.to_string()).monospace().color(ACCENT_RED));
        });
    });
}

fn fmt_num(n: usize) -> String {
    if n >= 1_000_000 {
        format!("{:.2}M", n as f64 / 1_000_000.0)
    } else if n >= 1_000 {
        format!("{:.1}K", n as f64 / 1_000.0)
    } else {
        format!("{}", n)
    }
}
