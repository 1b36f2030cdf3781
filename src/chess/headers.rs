use indexmap::IndexMap;
use serde::Serialize;

use super::error::{ImportError, Result};

/// Tag pairs in first-seen order.
///
/// Re-inserting an existing key replaces its value in place, so the map can be
/// written back out in the order the tags appeared in the source text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct HeaderMap(IndexMap<String, String>);

impl HeaderMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Returns the previous value when `key` was already present.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for HeaderMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeaderLine {
    start: usize,
    end: usize,
    terminator: &'static str,
}

/// The contiguous tag-pair block at the top of a PGN text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderBlock {
    pub headers: HeaderMap,
    last_line: Option<HeaderLine>,
}

impl HeaderBlock {
    /// Byte offset just past the content of the last header line (0 when the
    /// text has no headers).
    pub fn end(&self) -> usize {
        self.last_line.map_or(0, |line| line.end)
    }

    /// Adds `[key "value"]` as the last line of the header block in `text`.
    ///
    /// The block must be followed by a blank line separating it from the
    /// movetext; everything else in `text` is kept byte for byte.
    pub fn append_header_line(&self, text: &str, key: &str, value: &str) -> Result<String> {
        let Some(last) = self.last_line else {
            return Err(ImportError::MalformedPgn {
                last_header: String::new(),
            });
        };

        let rest = &text[last.end + last.terminator.len()..];
        let followed_by_blank_line = !last.terminator.is_empty()
            && rest
                .split_inclusive('\n')
                .next()
                .is_some_and(|line| line.ends_with('\n') && line.trim().is_empty());

        if !followed_by_blank_line {
            return Err(ImportError::MalformedPgn {
                last_header: text[last.start..last.end].to_string(),
            });
        }

        let mut out = String::with_capacity(text.len() + key.len() + value.len() + 8);
        out.push_str(&text[..last.end]);
        out.push_str(last.terminator);
        out.push('[');
        out.push_str(key);
        out.push_str(" \"");
        out.push_str(value);
        out.push_str("\"]");
        out.push_str(&text[last.end..]);
        Ok(out)
    }
}

fn split_line_terminator(raw: &str) -> (&str, &'static str) {
    if let Some(line) = raw.strip_suffix("\r\n") {
        (line, "\r\n")
    } else if let Some(line) = raw.strip_suffix('\n') {
        (line, "\n")
    } else {
        (raw, "")
    }
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('[') && line.ends_with("\"]")
}

fn parse_header_line(line: &str) -> Result<(&str, &str)> {
    let malformed = || ImportError::MalformedHeader {
        line: line.to_string(),
    };

    let delimiter = line.find(" \"").ok_or_else(malformed)?;
    let value_start = delimiter + 2;
    let value_end = line.len() - 2;
    if value_start > value_end {
        return Err(malformed());
    }

    Ok((&line[1..delimiter], &line[value_start..value_end]))
}

/// Scans the tag pairs at the top of `text`, stopping at the first line that
/// is not shaped like `[Key "Value"]`.
pub fn scan_header_block(text: &str) -> Result<HeaderBlock> {
    let mut headers = HeaderMap::new();
    let mut last_line = None;
    let mut offset = 0;

    for raw in text.split_inclusive('\n') {
        let start = offset;
        offset += raw.len();

        let (line, terminator) = split_line_terminator(raw);
        if !is_header_line(line) {
            break;
        }

        let (key, value) = parse_header_line(line)?;
        headers.insert(key, value);
        last_line = Some(HeaderLine {
            start,
            end: start + line.len(),
            terminator,
        });
    }

    Ok(HeaderBlock { headers, last_line })
}

pub fn scan_headers(text: &str) -> Result<HeaderMap> {
    scan_header_block(text).map(|block| block.headers)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GAME: &str = "[Event \"Casual\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n\n1. e4 e5 *";

    #[test]
    fn test_scan_headers_preserves_source_order() {
        let headers = scan_headers(GAME).unwrap();

        let keys: Vec<&str> = headers.keys().collect();
        assert_eq!(keys, ["Event", "White", "Black"]);
        assert_eq!(headers.get("White"), Some("Alice"));
        assert_eq!(headers.get("Black"), Some("Bob"));
    }

    #[test]
    fn test_scan_headers_duplicate_key_overwrites_in_place() {
        let pgn = "[Event \"First\"]\n[Site \"Here\"]\n[Event \"Second\"]\n\n*";
        let headers = scan_headers(pgn).unwrap();

        let pairs: Vec<(&str, &str)> = headers.iter().collect();
        assert_eq!(pairs, [("Event", "Second"), ("Site", "Here")]);
    }

    #[test]
    fn test_scan_headers_stops_at_first_non_header_line() {
        let pgn = "[White \"A\"]\n\n1. e4 { [Black \"not a tag\"] } *\n[Date \"2024.01.01\"]";
        let headers = scan_headers(pgn).unwrap();

        assert_eq!(headers.len(), 1);
        assert!(!headers.contains_key("Black"));
        assert!(!headers.contains_key("Date"));
    }

    #[test]
    fn test_scan_headers_stops_at_blank_line_inside_block() {
        let pgn = "[White \"A\"]\n\n[Black \"B\"]\n\n1. d4 *";
        let headers = scan_headers(pgn).unwrap();

        assert_eq!(headers.keys().collect::<Vec<_>>(), ["White"]);
    }

    #[test]
    fn test_scan_headers_value_may_contain_delimiter() {
        let headers = scan_headers("[Event \"Rapid \"Open\" 2024\"]\n\n*").unwrap();
        assert_eq!(headers.get("Event"), Some("Rapid \"Open\" 2024"));
    }

    #[test]
    fn test_scan_headers_empty_value() {
        let headers = scan_headers("[Annotator \"\"]\n\n*").unwrap();
        assert_eq!(headers.get("Annotator"), Some(""));
    }

    #[test]
    fn test_scan_headers_handles_crlf() {
        let headers = scan_headers("[White \"A\"]\r\n[Black \"B\"]\r\n\r\n1. e4 *").unwrap();
        assert_eq!(headers.get("White"), Some("A"));
        assert_eq!(headers.get("Black"), Some("B"));
    }

    #[test]
    fn test_scan_headers_without_headers_is_empty() {
        assert!(scan_headers("1. e4 e5 *").unwrap().is_empty());
        assert!(scan_headers("").unwrap().is_empty());
    }

    #[test]
    fn test_scan_headers_malformed_line_is_an_error() {
        let err = scan_headers("[White \"A\"]\n[Black\"B\"]\n\n*").unwrap_err();
        match err {
            ImportError::MalformedHeader { line } => assert_eq!(line, "[Black\"B\"]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_scan_headers_delimiter_overlapping_closing_quote_is_malformed() {
        let err = scan_headers("[White \"]\n\n*").unwrap_err();
        assert!(matches!(err, ImportError::MalformedHeader { .. }));
    }

    #[test]
    fn test_scan_headers_is_idempotent() {
        assert_eq!(scan_headers(GAME).unwrap(), scan_headers(GAME).unwrap());
    }

    #[test]
    fn test_append_header_line_inserts_before_blank_line() {
        let block = scan_header_block(GAME).unwrap();
        let out = block.append_header_line(GAME, "PlyCount", "3").unwrap();

        assert_eq!(
            out,
            "[Event \"Casual\"]\n[White \"Alice\"]\n[Black \"Bob\"]\n[PlyCount \"3\"]\n\n1. e4 e5 *"
        );
    }

    #[test]
    fn test_append_header_line_keeps_crlf_style() {
        let pgn = "[White \"A\"]\r\n\r\n1. e4 *";
        let block = scan_header_block(pgn).unwrap();
        let out = block.append_header_line(pgn, "PlyCount", "2").unwrap();

        assert_eq!(out, "[White \"A\"]\r\n[PlyCount \"2\"]\r\n\r\n1. e4 *");
    }

    #[test]
    fn test_append_header_line_requires_blank_line_after_block() {
        let pgn = "[White \"A\"]\n1. e4 *";
        let block = scan_header_block(pgn).unwrap();

        match block.append_header_line(pgn, "PlyCount", "2").unwrap_err() {
            ImportError::MalformedPgn { last_header } => assert_eq!(last_header, "[White \"A\"]"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_append_header_line_rejects_headers_only_text() {
        for pgn in ["[White \"A\"]", "[White \"A\"]\n"] {
            let block = scan_header_block(pgn).unwrap();
            let err = block.append_header_line(pgn, "PlyCount", "1").unwrap_err();
            assert!(matches!(err, ImportError::MalformedPgn { .. }), "{pgn:?}");
        }
    }

    #[test]
    fn test_header_block_end_offset() {
        let block = scan_header_block(GAME).unwrap();
        assert_eq!(&GAME[..block.end()], "[Event \"Casual\"]\n[White \"Alice\"]\n[Black \"Bob\"]");
    }

    #[test]
    fn test_header_map_serializes_in_insertion_order() {
        let headers: HeaderMap = [("White", "A"), ("Black", "B"), ("Date", "2024.01.02")]
            .into_iter()
            .collect();

        let json = serde_json::to_string(&headers).unwrap();
        assert_eq!(json, r#"{"White":"A","Black":"B","Date":"2024.01.02"}"#);
    }

    #[test]
    fn test_header_map_insert_replaces_value_in_place() {
        let mut headers: HeaderMap = [("White", "A"), ("Black", "B")].into_iter().collect();

        assert_eq!(headers.insert("White", "C"), Some("A".to_string()));
        assert_eq!(headers.insert("PlyCount", "3"), None);
        assert_eq!(headers.keys().collect::<Vec<_>>(), ["White", "Black", "PlyCount"]);
        assert_eq!(headers.get("White"), Some("C"));
    }
}
