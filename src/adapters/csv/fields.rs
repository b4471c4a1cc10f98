/// Quote-aware CSV field splitter.
///
/// Iterates characters, toggling an in-quotes flag on each `"` and
/// collapsing adjacent `""` into a literal `"`. Only commas outside
/// quotes act as field separators. This is not a byte-for-byte CSV
/// standard implementation, just enough to read back what this crate
/// writes (and the legacy files it inherits).
pub(super) fn split_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                if chars.peek() == Some(&'"') {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = !in_quotes;
                }
            }
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

/// Wrap a field in quotes, doubling any embedded `"`.
pub(super) fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_plain_fields() {
        assert_eq!(split_line("a,b,c"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_split_keeps_quoted_commas() {
        assert_eq!(
            split_line(r#""last, first",second"#),
            vec!["last, first", "second"]
        );
    }

    #[test]
    fn test_split_collapses_doubled_quotes() {
        assert_eq!(
            split_line(r#""say ""hi""",x"#),
            vec![r#"say "hi""#, "x"]
        );
    }

    #[test]
    fn test_split_preserves_empty_fields() {
        assert_eq!(split_line("a,,"), vec!["a", "", ""]);
    }

    #[test]
    fn test_quote_round_trips_through_split() {
        let nasty = r#"a "quoted", field"#;
        let line = format!("{},tail", quote(nasty));
        assert_eq!(split_line(&line), vec![nasty, "tail"]);
    }
}
