//! Cycle summary and diagnostic formatting.

use std::time::Duration;

use owo_colors::Style;
use subpack_core::Diagnostic;

use super::paint;

/// Lines of a diagnostic message shown under its header.
const MESSAGE_LINES: usize = 3;

/// Outcome of one build cycle as shown in the summary row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    Success,
    Warnings,
    Failed,
}

impl CycleStatus {
    pub fn from_counts(errors: usize, warnings: usize) -> Self {
        if errors > 0 {
            Self::Failed
        } else if warnings > 0 {
            Self::Warnings
        } else {
            Self::Success
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Warnings => "warning",
            Self::Failed => "failed",
        }
    }

    fn style(self) -> Style {
        match self {
            Self::Success => Style::new().green().bold(),
            Self::Warnings => Style::new().yellow().bold(),
            Self::Failed => Style::new().red().bold(),
        }
    }
}

/// One row of the console summary printed after every cycle.
#[derive(Debug, Clone)]
pub struct SummaryRow {
    /// Wall-clock time the cycle finished, `HH:MM:SS`
    pub time: String,
    pub status: CycleStatus,
    pub watched_files: usize,
    pub pages: usize,
    pub components: usize,
    pub duration: Duration,
    pub hash: String,
    pub warnings: usize,
    pub errors: usize,
}

/// Format duration in human-readable format.
///
/// ```
/// use std::time::Duration;
/// use subpack_cli::ui::format_duration;
///
/// assert_eq!(format_duration(Duration::from_millis(50)), "50ms");
/// assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ms = duration.as_millis();

    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", duration.as_secs_f64())
    } else {
        let secs = duration.as_secs();
        format!("{}m {}s", secs / 60, secs % 60)
    }
}

impl SummaryRow {
    pub fn render(&self) -> String {
        let dim = Style::new().dimmed();
        let mut row = format!(
            "{} {} {} {} {} {} {} {}",
            paint(&self.time, dim),
            paint(format!("{:<7}", self.status.label()), self.status.style()),
            paint("watch", dim),
            self.watched_files,
            paint("pages", dim),
            self.pages,
            paint("components", dim),
            self.components,
        );
        row.push_str(&format!(
            " {} {} {}",
            paint(format_duration(self.duration), Style::new().cyan()),
            paint("hash", dim),
            self.hash,
        ));
        if self.warnings > 0 {
            row.push_str(&format!(
                " {}",
                paint(format!("{} warning(s)", self.warnings), Style::new().yellow())
            ));
        }
        if self.errors > 0 {
            row.push_str(&format!(
                " {}",
                paint(format!("{} error(s)", self.errors), Style::new().red())
            ));
        }
        row
    }
}

pub fn print_summary(row: &SummaryRow) {
    eprintln!("{}", row.render());
}

/// `Error in file <module>:<line:col>` followed by the first message lines.
pub fn format_diagnostic(diagnostic: &Diagnostic) -> String {
    let (label, style) = if diagnostic.is_error() {
        ("Error", Style::new().red().bold())
    } else {
        ("Warning", Style::new().yellow().bold())
    };

    let mut out = match &diagnostic.module {
        Some(module) => format!(
            "{} in file {}:{}",
            paint(label, style),
            paint(module, Style::new().bold()),
            diagnostic.location()
        ),
        None => format!("{}:", paint(label, style)),
    };

    for line in diagnostic
        .message
        .lines()
        .filter(|line| !line.trim().is_empty())
        .take(MESSAGE_LINES)
    {
        out.push_str("\n  ");
        out.push_str(line.trim_end());
    }
    out
}

pub fn print_diagnostics<'a>(diagnostics: impl IntoIterator<Item = &'a Diagnostic>) {
    for diagnostic in diagnostics {
        eprintln!("{}\n", format_diagnostic(diagnostic));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use subpack_core::DiagnosticKind;

    #[test]
    fn diagnostic_header_and_three_lines() {
        super::super::init_colors(true);
        let diagnostic = Diagnostic::error(
            DiagnosticKind::Compiler,
            Some("pages/a/a.js".to_string()),
            "Module build failed (12:4)\nline two\n\nline three\nline four",
        );
        assert_eq!(
            format_diagnostic(&diagnostic),
            "Error in file pages/a/a.js:12:4\n  Module build failed (12:4)\n  line two\n  line three"
        );
    }

    #[test]
    fn status_follows_counts() {
        assert_eq!(CycleStatus::from_counts(1, 5), CycleStatus::Failed);
        assert_eq!(CycleStatus::from_counts(0, 5), CycleStatus::Warnings);
        assert_eq!(CycleStatus::from_counts(0, 0), CycleStatus::Success);
    }

    #[test]
    fn summary_row_lists_counts() {
        super::super::init_colors(true);
        let row = SummaryRow {
            time: "10:42:07".to_string(),
            status: CycleStatus::Warnings,
            watched_files: 14,
            pages: 3,
            components: 2,
            duration: Duration::from_millis(85),
            hash: "0123456789abcdef".to_string(),
            warnings: 1,
            errors: 0,
        };
        assert_eq!(
            row.render(),
            "10:42:07 warning watch 14 pages 3 components 2 85ms hash 0123456789abcdef 1 warning(s)"
        );
    }
}
