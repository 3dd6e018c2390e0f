//! Build diagnostics: compiler errors and warnings passed through verbatim,
//! plus the recoverable discovery errors raised by the core itself.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\((\d+:\d+)\)").unwrap_or_else(|e| panic!("invalid location pattern: {e}"))
});

/// Diagnostic severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Where a diagnostic came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A discovered entry candidate could not be read.
    Discovery,
    /// An import specifier could not be resolved.
    Resolve,
    /// Anything else the compiler reported.
    Compiler,
}

/// One error or warning, optionally attributed to a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub module: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(kind: DiagnosticKind, module: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            kind,
            module,
            message: message.into(),
        }
    }

    pub fn warning(kind: DiagnosticKind, module: Option<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            kind,
            module,
            message: message.into(),
        }
    }

    /// `line:col` taken from a `(12:4)` marker on the first message line,
    /// `1:1` when there is none.
    pub fn location(&self) -> &str {
        let first = self.headline();
        LOCATION
            .captures(first)
            .and_then(|c| c.get(1))
            .map_or("1:1", |m| m.as_str())
    }

    /// First line of the message.
    pub fn headline(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }

    /// Message lines after the headline, blank separators skipped.
    pub fn details(&self) -> impl Iterator<Item = &str> {
        self.message
            .lines()
            .skip(1)
            .filter(|line| !line.trim().is_empty())
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Ordered diagnostic collection of a pass or build cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        self.items.push(diagnostic);
    }

    pub fn error(&mut self, kind: DiagnosticKind, module: Option<String>, message: impl Into<String>) {
        self.push(Diagnostic::error(kind, module, message));
    }

    pub fn warning(&mut self, kind: DiagnosticKind, module: Option<String>, message: impl Into<String>) {
        self.push(Diagnostic::warning(kind, module, message));
    }

    /// Append `diagnostic` unless an identical one is already present.
    pub fn push_unique(&mut self, diagnostic: Diagnostic) {
        if !self.items.contains(&diagnostic) {
            self.items.push(diagnostic);
        }
    }

    pub fn extend_unique(&mut self, other: Diagnostics) {
        for diagnostic in other.items {
            self.push_unique(diagnostic);
        }
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.severity == Severity::Warning)
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Extend<Diagnostic> for Diagnostics {
    fn extend<T: IntoIterator<Item = Diagnostic>>(&mut self, iter: T) {
        self.items.extend(iter);
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}
