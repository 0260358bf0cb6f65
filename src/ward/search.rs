//! Line-oriented matching over decrypted secrets.

use regex::{Regex, RegexBuilder};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{Result, WardedError};

/// One regex match inside one line of one secret.
///
/// `start` and `end` are character offsets into `line`.
#[derive(Debug, Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct SearchResult {
    pub name: String,
    pub line: String,
    pub line_number: usize,
    pub start: usize,
    pub end: usize,
}

impl SearchResult {
    /// Split `line` into the text before, inside and after the match.
    pub fn parts(&self) -> (&str, &str, &str) {
        let start = char_to_byte(&self.line, self.start);
        let end = char_to_byte(&self.line, self.end);
        (
            &self.line[..start],
            &self.line[start..end],
            &self.line[end..],
        )
    }
}

fn char_to_byte(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Every non-overlapping match of `pattern` in `plaintext`, one result
/// per match, in line order.
pub fn search_text(name: &str, plaintext: &str, pattern: &Regex) -> Vec<SearchResult> {
    let mut results = Vec::new();
    for (line_number, line) in plaintext.split('\n').enumerate() {
        for m in pattern.find_iter(line) {
            let start = line[..m.start()].chars().count();
            let end = start + m.as_str().chars().count();
            results.push(SearchResult {
                name: name.to_string(),
                line: line.to_string(),
                line_number,
                start,
                end,
            });
        }
    }
    results
}

/// Compile a user pattern, optionally ignoring case.
pub fn compile(pattern: &str, ignore_case: bool) -> Result<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| WardedError::InvalidPattern(e.to_string()))
}

/// Values of `key: value` style lines.
///
/// For each line whose start matches `pattern` (case-insensitive), the
/// rest of the line after optional whitespace is returned.  At most
/// `max` values are returned; `0` means no limit.
pub fn field_values(plaintext: &str, pattern: &str, max: usize) -> Result<Vec<String>> {
    let anchored = compile(&format!(r"^(?:{pattern})\s*(.*)$"), true)?;

    let mut values = Vec::new();
    for line in plaintext.split('\n') {
        if max > 0 && values.len() >= max {
            break;
        }
        if let Some(caps) = anchored.captures(line) {
            if let Some(rest) = caps.get(1) {
                values.push(rest.as_str().to_string());
            }
        }
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_every_match_with_char_offsets() {
        let re = Regex::new("ab").unwrap();
        let results = search_text("site", "xxab ab\nnone\näbab", &re);

        let found: Vec<_> = results
            .iter()
            .map(|r| (r.line_number, r.start, r.end))
            .collect();
        assert_eq!(found, vec![(0, 2, 4), (0, 5, 7), (2, 2, 4)]);
        assert!(results.iter().all(|r| r.name == "site"));
        assert_eq!(results[2].line, "äbab");
    }

    #[test]
    fn parts_split_around_the_match() {
        let re = Regex::new("pass").unwrap();
        let results = search_text("n", "é pass word", &re);
        assert_eq!(results[0].parts(), ("é ", "pass", " word"));
    }

    #[test]
    fn compile_honours_ignore_case() {
        assert!(compile("SECRET", true).unwrap().is_match("my secret"));
        assert!(!compile("SECRET", false).unwrap().is_match("my secret"));
        assert!(matches!(
            compile("(", false),
            Err(WardedError::InvalidPattern(_))
        ));
    }

    #[test]
    fn field_values_strip_prefix_and_whitespace() {
        let text = "hunter2\nUser:   alice\nuser: bob\nurl: https://example.com";
        assert_eq!(field_values(text, "user:", 0).unwrap(), vec!["alice", "bob"]);
        assert_eq!(field_values(text, "user:", 1).unwrap(), vec!["alice"]);
        assert_eq!(
            field_values(text, "url:", 0).unwrap(),
            vec!["https://example.com"]
        );
        assert!(field_values(text, "email:", 0).unwrap().is_empty());
    }
}
