//! Import specifier scanning.

use std::sync::LazyLock;

use regex::Regex;

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?m)(?:\bimport\s+(?:[\w$*{}\s,]+?\s+from\s+)?|\bexport\s+(?:\*|\{[^}]*\})\s+from\s+|\brequire\s*\(\s*)['"]([^'"\n]+)['"]"#,
    )
    .unwrap_or_else(|e| panic!("invalid import pattern: {e}"))
});

static LINE_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*//.*$").unwrap_or_else(|e| panic!("invalid comment pattern: {e}")));

/// A module specifier found in source text, with its 1-based position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRef {
    pub specifier: String,
    pub line: usize,
    pub column: usize,
}

/// Every `require('x')`, `import ... from 'x'`, `import 'x'` and
/// `export ... from 'x'` in `source`, in source order.
///
/// Whole-line `//` comments are skipped. Dynamic specifiers are not seen.
pub fn scan_imports(source: &str) -> Vec<ImportRef> {
    let commented: Vec<(usize, usize)> = LINE_COMMENT
        .find_iter(source)
        .map(|m| (m.start(), m.end()))
        .collect();

    IMPORT
        .captures_iter(source)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            if commented
                .iter()
                .any(|(start, end)| whole.start() >= *start && whole.start() < *end)
            {
                return None;
            }
            let (line, column) = position(source, whole.start());
            Some(ImportRef {
                specifier: caps.get(1)?.as_str().to_string(),
                line,
                column,
            })
        })
        .collect()
}

fn position(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset];
    let line = before.matches('\n').count() + 1;
    let column = before.rfind('\n').map_or(offset, |nl| offset - nl - 1) + 1;
    (line, column)
}
