use regex::{Regex, RegexBuilder};

/// Escape arbitrary user text so it matches only itself when used as a pattern.
///
/// Every regex metacharacter (`. * + ? ^ $ { } ( ) | [ ] \` plus `# & - ~`) is
/// backslash-escaped. Total: never fails.
pub fn escape_pattern(text: &str) -> String {
    regex::escape(text)
}

/// Compile a case-insensitive matcher for the literal `text`.
///
/// Only fails for inputs so large that the compiled program exceeds the regex
/// size limit; callers treat that as "not found".
pub fn literal_matcher(text: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(&escape_pattern(text))
        .case_insensitive(true)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn matches_in(corpus: &[&str], needle: &str) -> Vec<String> {
        let re = literal_matcher(needle).unwrap();
        corpus
            .iter()
            .flat_map(|line| re.find_iter(line).map(|m| m.as_str().to_string()))
            .collect()
    }

    #[rstest]
    #[case("$3,000", &["You have $3,000 in the bank", "you have 3,000", "$3000", "$3x000"], 1)]
    #[case("(maybe)", &["and (maybe) not", "maybe", "(maybe", "maybe)"], 1)]
    #[case("a+b", &["a+b", "aab", "ab", "a+b a+b"], 3)]
    #[case("end.", &["the end.", "the endx", "ending"], 1)]
    #[case("[x]|y*", &["[x]|y*", "x", "y", "[x]|yy"], 1)]
    #[case("^start$", &["^start$ here", "start"], 1)]
    #[case("back\\slash", &["back\\slash", "backslash", "back/slash"], 1)]
    #[case("{2}?", &["{2}?", "22", "{2}"], 1)]
    #[case("a-b~c#d&e", &["a-b~c#d&e", "abcde"], 1)]
    fn escaped_pattern_matches_only_literal_occurrences(
        #[case] needle: &str,
        #[case] corpus: &[&str],
        #[case] expected: usize,
    ) {
        let found = matches_in(corpus, needle);
        assert_eq!(found.len(), expected, "needle {needle:?} found {found:?}");
        for hit in found {
            assert_eq!(hit.to_lowercase(), needle.to_lowercase());
        }
    }

    #[test]
    fn matching_ignores_case() {
        let re = literal_matcher("Risk Management.").unwrap();
        assert!(re.is_match("risk management. matters"));
        assert!(!re.is_match("risk managementX"));
    }

    #[test]
    fn every_listed_metacharacter_is_escaped() {
        let escaped = escape_pattern(r".*+?^${}()|[]\");
        assert_eq!(escaped, r"\.\*\+\?\^\$\{\}\(\)\|\[\]\\");
    }

    #[test]
    fn plain_text_is_unchanged() {
        assert_eq!(escape_pattern("Doesn't matter"), "Doesn't matter");
        assert_eq!(escape_pattern(""), "");
    }
}
