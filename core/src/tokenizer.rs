use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Anything that is not an ASCII letter or digit, underscores included.
    static ref NON_WORD: Regex = Regex::new(r"[^a-z0-9]+").expect("valid regex");
}

/// Lowercases `text`, turns every run of non-word characters and underscores
/// into a single space, and trims the ends.
pub fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    NON_WORD.replace_all(&lowered, " ").trim().to_string()
}

/// Splits cleaned text into its non-empty words, in document order.
pub fn tokenize(text: &str) -> Vec<String> {
    clean_text(text)
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Hello, World! hello_world");
        assert_eq!(t, vec!["hello", "world", "hello", "world"]);
    }

    #[test]
    fn clean_collapses_runs() {
        assert_eq!(clean_text("  --A  b__c--  "), "a b c");
    }
}
