use regex::{Regex, RegexBuilder};

use lyoha_core::error::{LyohaError, Result};

/// Case-insensitive vocabulary that marks a message as addressed to the bot,
/// compiled into a single matcher.
#[derive(Debug, Clone)]
pub struct TriggerSet {
    pattern: Regex,
}

impl TriggerSet {
    /// Build from `words`, ignoring blank entries.
    ///
    /// Fails with `InvalidConfiguration` when no non-blank word remains.
    pub fn new<I, S>(words: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let escaped: Vec<String> = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_string())
            .filter(|w| !w.is_empty())
            .map(|w| regex::escape(&w))
            .collect();

        if escaped.is_empty() {
            return Err(LyohaError::InvalidConfiguration(
                "trigger_words must contain at least one non-empty word".into(),
            ));
        }

        let pattern = RegexBuilder::new(&escaped.join("|"))
            .case_insensitive(true)
            .build()
            .map_err(|e| LyohaError::InvalidConfiguration(format!("trigger words: {e}")))?;

        Ok(Self { pattern })
    }

    /// Returns `true` if any trigger occurs anywhere in `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_substring_case_insensitively() {
        let triggers = TriggerSet::new(["Leha", "Lyoha"]).unwrap();
        assert!(triggers.matches("hey Leha, status?"));
        assert!(triggers.matches("LYOHA!"));
        assert!(triggers.matches("ask lyohaGPT"));
        assert!(!triggers.matches("hi there"));
    }

    #[test]
    fn cyrillic_words_fold_case() {
        let triggers = TriggerSet::new(["Леха", "Лёха"]).unwrap();
        assert!(triggers.matches("леха, привет"));
        assert!(triggers.matches("ЛЁХА"));
        assert!(!triggers.matches("привет всем"));
    }

    #[test]
    fn metacharacters_are_literal() {
        let triggers = TriggerSet::new(["c++", "a.b"]).unwrap();
        assert!(triggers.matches("I like C++"));
        assert!(!triggers.matches("axb"));
    }

    #[test]
    fn blank_words_are_ignored() {
        let triggers = TriggerSet::new(["  ", "bot"]).unwrap();
        assert!(triggers.matches("hello bot"));
        assert!(!triggers.matches("hello"));
    }

    #[test]
    fn empty_vocabulary_is_invalid() {
        let words: [&str; 0] = [];
        assert!(matches!(
            TriggerSet::new(words),
            Err(LyohaError::InvalidConfiguration(_))
        ));
        assert!(TriggerSet::new([" ", ""]).is_err());
    }
}
