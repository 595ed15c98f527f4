//! Text normalization and math expression extraction.

use once_cell::sync::Lazy;
use regex::Regex;

/// Expression patterns, applied in order. Each runs over the whole text.
static EXPRESSION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        // numeric arithmetic: 2 + 2, 3.5 * .5
        r"(?:\d+\.?\d*|\.\d+)\s*[-+*/=]\s*(?:\d+\.?\d*|\.\d+)",
        // variable op number: x = 5, y*2
        r"[a-zA-Z]\s*[-+*/=]\s*\d+",
        // single-letter function: f(x)
        r"[a-zA-Z]\([a-zA-Z]\)",
        // assignment: speed = 12.5
        r"\b\w+\s*=\s*[-+]?\d*\.?\d+",
        // square root
        r"√\d+",
        // bare variables
        r"\b[xyz]\b",
        // bare coefficients
        r"\b[abc]\b",
        // coordinates: (1, -2)
        r"\(\s*[-+]?\d*\.?\d+\s*[,\s]\s*[-+]?\d*\.?\d+\s*\)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("expression pattern is valid"))
    .collect()
});

/// Collapse every whitespace run to a single space and trim.
pub fn clean_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Replace non-ASCII operators and pad arithmetic operators with spaces.
///
/// The result is whitespace-collapsed, so `"2+2"` becomes `"2 + 2"` and
/// `"2 + 2"` stays unchanged.
pub fn normalize_math_symbols(text: &str) -> String {
    let mut padded = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        let c = match c {
            '×' => '*',
            '÷' => '/',
            '−' => '-',
            other => other,
        };
        if matches!(c, '=' | '+' | '-' | '*' | '/') {
            padded.push(' ');
            padded.push(c);
            padded.push(' ');
        } else {
            padded.push(c);
        }
    }
    clean_text(&padded)
}

/// Extract math expressions, deduplicated in first-seen order.
pub fn extract_math_expressions(text: &str) -> Vec<String> {
    let mut expressions: Vec<String> = Vec::new();
    for pattern in EXPRESSION_PATTERNS.iter() {
        for m in pattern.find_iter(text) {
            let expr = m.as_str().trim();
            if !expr.is_empty() && !expressions.iter().any(|e| e == expr) {
                expressions.push(expr.to_string());
            }
        }
    }
    expressions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_text_collapses_whitespace() {
        assert_eq!(clean_text("  solve\n\n 2x   = 4\t "), "solve 2x = 4");
        assert_eq!(clean_text(""), "");
        assert_eq!(clean_text(" \n\t "), "");
    }

    #[test]
    fn test_clean_text_is_idempotent() {
        for input in [
            "  a  b  ",
            "line one\nline two\r\nline three",
            "already clean",
            "\u{00a0}nbsp\u{2003}em space",
            "",
        ] {
            let once = clean_text(input);
            assert_eq!(clean_text(&once), once, "input: {:?}", input);
        }
    }

    #[test]
    fn test_normalize_math_symbols_replaces_unicode_operators() {
        assert_eq!(normalize_math_symbols("3×4÷2−1"), "3 * 4 / 2 - 1");
    }

    #[test]
    fn test_normalize_math_symbols_pads_operators() {
        assert_eq!(normalize_math_symbols("2x+3=7"), "2x + 3 = 7");
        assert_eq!(normalize_math_symbols("2 + 2 = 4"), "2 + 2 = 4");
    }

    #[test]
    fn test_normalize_math_symbols_is_idempotent() {
        let once = normalize_math_symbols("a*b/c=d−e");
        assert_eq!(normalize_math_symbols(&once), once);
    }

    #[test]
    fn test_extract_mixed_expression_order() {
        let exprs = extract_math_expressions("2 + 2 = 4 and x = 5");
        assert_eq!(exprs, vec!["2 + 2", "x = 5", "2 = 4", "x"]);
    }

    #[test]
    fn test_extract_is_deterministic_and_unique() {
        let text = "2 + 2 = 4 and x = 5";
        let first = extract_math_expressions(text);
        let second = extract_math_expressions(text);
        assert_eq!(first, second);

        let mut deduped = first.clone();
        deduped.sort();
        deduped.dedup();
        assert_eq!(deduped.len(), first.len());
    }

    #[test]
    fn test_extract_function_notation() {
        let exprs = extract_math_expressions("find f(x) when g(t) is known");
        assert!(exprs.contains(&"f(x)".to_string()));
        assert!(exprs.contains(&"g(t)".to_string()));
    }

    #[test]
    fn test_extract_square_root() {
        let exprs = extract_math_expressions("simplify √16 please");
        assert_eq!(exprs, vec!["√16"]);
    }

    #[test]
    fn test_extract_coordinates() {
        let exprs = extract_math_expressions("the line through (1, 2) and (-3.5, 4)");
        assert!(exprs.contains(&"(1, 2)".to_string()));
        assert!(exprs.contains(&"(-3.5, 4)".to_string()));
    }

    #[test]
    fn test_extract_coefficients() {
        let exprs = extract_math_expressions("if a and b are roots");
        assert_eq!(exprs, vec!["a", "b"]);
    }

    #[test]
    fn test_extract_nothing_from_prose() {
        assert!(extract_math_expressions("what is photosynthesis").is_empty());
        assert!(extract_math_expressions("").is_empty());
    }
}
