use chrono::Local;
use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::config::get_nickname;
use crate::ui::sel_style;

const LOGIN_LABEL: &str = "[ Log In ]";
const LOGOFF_LABEL: &str = "[ Log Off ]";

fn online_text() -> String {
    match get_nickname() {
        Some(n) => format!("{n} is online  {LOGOFF_LABEL}"),
        None => format!("logged off  {LOGIN_LABEL}"),
    }
}

// ── Status bar ────────────────────────────────────────────────────────────────

pub fn render_status_bar(f: &mut Frame, area: Rect) {
    if area.height == 0 {
        return;
    }

    let now = Local::now().format("%A, %d. %B - %H:%M").to_string();
    let right = online_text();

    let used = now.chars().count() + 1 + right.chars().count() + 1;
    let pad = " ".repeat((area.width as usize).saturating_sub(used));

    let line = Line::from(vec![
        Span::styled(format!(" {now}"), sel_style()),
        Span::styled(pad, sel_style()),
        Span::styled(format!("{right} "), sel_style()),
    ]);
    f.render_widget(Paragraph::new(line), area);
}

// The login toggle sits flush with the right edge, one space in.
pub fn login_button_rect(area: Rect) -> Rect {
    let label = if get_nickname().is_some() {
        LOGOFF_LABEL
    } else {
        LOGIN_LABEL
    };
    let w = label.len() as u16;
    Rect {
        x: area.x + area.width.saturating_sub(w + 1),
        y: area.y,
        width: w,
        height: 1,
    }
}
