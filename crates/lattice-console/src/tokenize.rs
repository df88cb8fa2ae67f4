//! Depth-aware command-line tokenizer.
//!
//! Splits one line of operator input into arguments. A space separates
//! tokens only at nesting depth zero, so bracketed or quoted groups travel
//! as single arguments with their delimiters intact — this is what lets a
//! raw JSON object ride the `request` command as one token:
//!
//! ```
//! use lattice_console::tokenize::tokenize;
//!
//! let tokens = tokenize(r#"request billing charge {"amount": 5}"#);
//! assert_eq!(tokens[3], r#"{"amount": 5}"#);
//! ```

/// Characters that open a nesting group.
const GROUP_OPENERS: [char; 3] = ['{', '[', '('];

/// Characters that close a nesting group.
const GROUP_CLOSERS: [char; 3] = ['}', ']', ')'];

/// Splits `line` into tokens.
///
/// Brackets and quotes share a single depth counter: an open quote suspends
/// splitting the same way an open bracket does, so correctness requires
/// balanced brackets and an even number of quotes. Interleavings like
/// `{"a": "b c"}` work because each delimiter pair nets to zero.
///
/// Returns an empty vector when the depth goes negative (more closers than
/// openers); callers treat that as an unparseable line. The final buffer is
/// always flushed, so an empty input yields one empty token rather than an
/// error.
#[must_use]
pub fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut depth: i32 = 0;
    let mut in_quote = false;

    for ch in line.chars() {
        let opens = GROUP_OPENERS.contains(&ch);
        let closes = !opens && GROUP_CLOSERS.contains(&ch);

        if opens {
            depth += 1;
        } else if closes {
            depth -= 1;
        }

        if ch == '"' {
            if in_quote {
                in_quote = false;
                depth -= 1;
            } else {
                in_quote = true;
                depth += 1;
            }
        }

        if depth < 0 {
            return Vec::new();
        }

        if ch == ' ' && depth == 0 {
            tokens.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }

    tokens.push(current);
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case("a b c", &["a", "b", "c"]; "plain words")]
    #[test_case("a (b c) d", &["a", "(b c)", "d"]; "parenthesized group")]
    #[test_case("a \"b c\" d", &["a", "\"b c\"", "d"]; "quoted group")]
    #[test_case("a {b [c d] e} f", &["a", "{b [c d] e}", "f"]; "nested brackets")]
    #[test_case(r#"request billing charge {"a": "b c"}"#,
        &["request", "billing", "charge", r#"{"a": "b c"}"#];
        "json payload with inner quoted space")]
    #[test_case("a  b", &["a", "", "b"]; "double space yields empty token")]
    #[test_case(" a", &["", "a"]; "leading space")]
    #[test_case("a ", &["a", ""]; "trailing space")]
    fn splits_at_top_level_spaces(line: &str, expected: &[&str]) {
        assert_eq!(tokenize(line), expected);
    }

    #[test]
    fn empty_line_yields_one_empty_token() {
        assert_eq!(tokenize(""), vec![String::new()]);
    }

    #[test_case("a )"; "unmatched close paren")]
    #[test_case(")"; "lone closer")]
    #[test_case("a }b{ c"; "closer before opener")]
    fn excess_closers_yield_empty_sequence(line: &str) {
        assert!(tokenize(line).is_empty());
    }

    #[test]
    fn unclosed_opener_is_not_an_error() {
        // Only depth going negative is a syntax error; a dangling opener
        // just swallows the rest of the line into one token.
        assert_eq!(tokenize("(a b"), vec!["(a b".to_string()]);
        assert_eq!(tokenize("a {b c"), vec!["a".to_string(), "{b c".to_string()]);
    }

    #[test]
    fn unclosed_quote_swallows_rest_of_line() {
        assert_eq!(
            tokenize("a \"b c"),
            vec!["a".to_string(), "\"b c".to_string()]
        );
    }

    #[test]
    fn quote_state_does_not_leak_between_calls() {
        // A line ending mid-quote must not corrupt the next call.
        assert_eq!(tokenize("\"a b"), vec!["\"a b".to_string()]);
        assert_eq!(tokenize("c d"), vec!["c".to_string(), "d".to_string()]);
    }

    #[test]
    fn delimiters_are_kept_in_tokens() {
        assert_eq!(tokenize("{}"), vec!["{}".to_string()]);
        assert_eq!(tokenize("\"x\""), vec!["\"x\"".to_string()]);
    }

    /// Strategy producing lines with balanced brackets and evenly paired
    /// quotes, built bottom-up so no prefix ever over-closes.
    fn balanced_line() -> impl Strategy<Value = String> {
        let leaf = "[a-z0-9:,. ]{0,12}";
        leaf.prop_recursive(4, 64, 6, |inner| {
            prop::collection::vec(
                prop_oneof![
                    "[a-z0-9:,. ]{0,12}".prop_map(String::from),
                    inner.clone().prop_map(|s| format!("({s})")),
                    inner.clone().prop_map(|s| format!("[{s}]")),
                    inner.clone().prop_map(|s| format!("{{{s}}}")),
                    inner.prop_map(|s| format!("\"{s}\"")),
                ],
                0..5,
            )
            .prop_map(|parts| parts.concat())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(512))]

        // Joining the tokens of a balanced line with single spaces restores
        // the line: every top-level space is a split point and nothing else
        // is lost.
        #[test]
        fn prop_balanced_lines_round_trip(line in balanced_line()) {
            let tokens = tokenize(&line);
            prop_assert!(!tokens.is_empty(), "balanced input must tokenize");
            prop_assert_eq!(tokens.join(" "), line);
        }

        // The tokenizer never panics, whatever the input.
        #[test]
        fn prop_tokenize_total(line in "\\PC*") {
            let _ = tokenize(&line);
        }
    }
}
