//! Terminal output: status messages, the per-cycle summary row and
//! diagnostics.
//!
//! Colors are decided once by [`init_colors`]: `--no-color` and `NO_COLOR`
//! disable them, `FORCE_COLOR` forces them, otherwise they follow whether
//! stderr is a terminal.

use std::fmt::Display;
use std::sync::atomic::{AtomicBool, Ordering};

use owo_colors::{OwoColorize, Style};

mod format;
mod messages;

pub use format::{CycleStatus, SummaryRow, format_diagnostic, format_duration, print_diagnostics, print_summary};
pub use messages::{error, info, success, warning};

static COLORS: AtomicBool = AtomicBool::new(false);

/// Decide whether output is colored. Call once at startup.
pub fn init_colors(no_color: bool) {
    COLORS.store(!no_color && should_use_color(), Ordering::Relaxed);
}

pub fn colors_enabled() -> bool {
    COLORS.load(Ordering::Relaxed)
}

/// Check if color output should be enabled.
pub fn should_use_color() -> bool {
    if std::env::var_os("NO_COLOR").is_some() {
        return false;
    }
    if std::env::var_os("FORCE_COLOR").is_some() {
        return true;
    }
    console::user_attended_stderr()
}

/// `text` in `style` when colors are enabled, plain otherwise.
pub(crate) fn paint(text: impl Display, style: Style) -> String {
    if colors_enabled() {
        text.style(style).to_string()
    } else {
        text.to_string()
    }
}
