use mar_core::TaskStatus;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const MUTED: Color = Color::Rgb(146, 131, 116);
pub const ACCENT: Color = Color::Rgb(131, 165, 152);
pub const WARN: Color = Color::Rgb(250, 189, 47);
pub const ERROR: Color = Color::Rgb(251, 73, 52);

pub const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

pub mod icons {
    pub const DOT: &str = "●";
    pub const FILE: &str = "*";
    pub const DIR: &str = "/";
    pub const WARNING: &str = "!";
}

pub fn spinner_frame(tick: usize) -> &'static str {
    SPINNER[tick % SPINNER.len()]
}

pub fn status_color(status: TaskStatus) -> Color {
    match status {
        TaskStatus::Completed => Color::Rgb(184, 187, 38),
        TaskStatus::Running => Color::Rgb(131, 165, 152),
        TaskStatus::Failed => Color::Rgb(254, 128, 25),
        TaskStatus::Pending => MUTED,
    }
}

pub fn id_badge_style(status: TaskStatus) -> Style {
    Style::new()
        .fg(Color::Black)
        .bg(status_color(status))
        .add_modifier(Modifier::BOLD)
}
