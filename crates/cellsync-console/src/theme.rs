use cellsync_core::ChatRole;
use ratatui::style::{Color, Modifier, Style};

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Rgb(142, 192, 124))
    .add_modifier(Modifier::BOLD);
pub const SELECTED_STYLE: Style = Style::new()
    .bg(Color::Rgb(131, 165, 152))
    .fg(Color::Black)
    .add_modifier(Modifier::BOLD);
pub const FOCUS_BORDER: Style = Style::new().fg(Color::Cyan);
pub const DIM_STYLE: Style = Style::new().fg(Color::Rgb(146, 131, 116));
pub const LOG_STYLE: Style = Style::new().fg(Color::Rgb(189, 174, 147));

const ALIVE: Color = Color::Rgb(184, 187, 38);
const DEAD: Color = Color::Rgb(251, 73, 52);

pub mod icons {
    pub const ALIVE: &str = "●";
    pub const DEAD: &str = "○";
}

pub fn cell_style(alive: bool) -> Style {
    let color = if alive { ALIVE } else { DEAD };
    Style::new().fg(color).add_modifier(Modifier::BOLD)
}

pub fn cell_chip(alive: bool) -> Style {
    let bg = if alive { ALIVE } else { DEAD };
    Style::new()
        .bg(bg)
        .fg(Color::Black)
        .add_modifier(Modifier::BOLD)
}

pub fn role_style(role: ChatRole) -> Style {
    match role {
        ChatRole::User => Style::new().fg(Color::Rgb(131, 165, 152)),
        ChatRole::Agent => Style::new().fg(Color::Rgb(235, 219, 178)),
        ChatRole::System => Style::new()
            .fg(Color::Rgb(250, 189, 47))
            .add_modifier(Modifier::ITALIC),
        ChatRole::Error => Style::new()
            .fg(Color::Rgb(251, 73, 52))
            .add_modifier(Modifier::BOLD),
    }
}

pub fn role_prefix(role: ChatRole) -> &'static str {
    match role {
        ChatRole::User => "you",
        ChatRole::Agent => "agent",
        ChatRole::System => "system",
        ChatRole::Error => "error",
    }
}
