pub mod panels;
pub mod theme;

pub use panels::{OverlayStats, draw_error_panel, draw_help_overlay};
pub use theme::apply_theme;
