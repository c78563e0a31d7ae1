//! Line-oriented substring matching with a best-effort comment filter.

/// Line prefixes that mark a whole line as a comment.
const COMMENT_PREFIXES: &[&str] = &["//", "#", "--", "<!--"];

/// True when the whole line is a comment, or sits inside a block comment
/// marker line.
pub fn is_comment_line(line: &str) -> bool {
    let trimmed = line.trim_start();

    if COMMENT_PREFIXES.iter().any(|p| trimmed.starts_with(p)) {
        return true;
    }

    trimmed.starts_with('*') || line.contains("/*") || line.contains("*/")
}

/// Whether `pattern` occurs in `line` as code rather than commentary.
///
/// A match that starts after a same-line `//` marker is ignored.
pub fn line_matches(line: &str, pattern: &str) -> bool {
    if is_comment_line(line) {
        return false;
    }

    let Some(idx) = line.find(pattern) else {
        return false;
    };

    match line.find("//") {
        Some(comment) if pattern.contains("//") => idx <= comment,
        Some(comment) => idx < comment,
        None => true,
    }
}

/// Patterns from `patterns` that occur as code anywhere in `content`, in
/// allowlist order.
pub fn matching_patterns<'p>(
    content: &str,
    patterns: &[&'p str],
) -> Vec<&'p str> {
    patterns
        .iter()
        .copied()
        .filter(|p| content.lines().any(|line| line_matches(line, p)))
        .collect()
}

/// Whether any of `patterns` occurs as code in `content`.
pub fn contains_any(content: &str, patterns: &[&str]) -> bool {
    content
        .lines()
        .any(|line| patterns.iter().any(|p| line_matches(line, p)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skips_full_line_comments() {
        assert!(is_comment_line("// counter.inc()"));
        assert!(is_comment_line("   # start_http_server(8000)"));
        assert!(is_comment_line("-- select"));
        assert!(is_comment_line("<!-- prom-client -->"));
        assert!(is_comment_line(" * tracer.startSpan()"));
        assert!(is_comment_line("/* Counter.builder( */"));
        assert!(!is_comment_line("counter.inc();"));
    }

    #[test]
    fn ignores_matches_after_trailing_comment() {
        assert!(line_matches("counter.inc(); // bump", ".inc("));
        assert!(!line_matches("doWork(); // counter.inc()", ".inc("));
    }

    #[test]
    fn url_patterns_are_not_cut_by_comment_marker() {
        assert!(line_matches(
            "const url = \"http://localhost:9090\";",
            "\"http://"
        ));
    }

    #[test]
    fn returns_matched_patterns_in_order() {
        let content = "const c = new Counter({});\n// register.metrics()\nc.inc();\n";
        let found = matching_patterns(content, &["Counter(", "register.metrics(", ".inc("]);
        assert_eq!(found, vec!["Counter(", ".inc("]);
        assert!(contains_any(content, &[".inc("]));
        assert!(!contains_any(content, &["register.metrics("]));
    }
}
