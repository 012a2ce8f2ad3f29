//! Matching-mode transforms applied to lazily stored condition terms.
//!
//! Every helper here is a pure function over strings. The transform pipeline run by
//! [`apply_matching`] is, per term:
//!
//! 1. escape the configured characters (`\` prefix),
//! 2. optionally split on unescaped non-word characters,
//! 3. strip every remaining unescaped syntax character,
//! 4. drop empty terms and stop words,
//! 5. expand into a weighted alternation of exact / prefix / fuzzy forms.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use super::format_numeric;

/// Characters with meaning in the RediSearch query language.
pub const SYNTAX_CHARS: &str = "\\()|-~\"'@:[]{}*%$=<>;!&?^+";

/// An escaped pair, or any bare syntax character.
static ESCAPED_OR_SYNTAX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\.|[\\()|\-\~"'@:\[\]{}*%$=<>;!\&?\^+]"#).expect("syntax pattern compiles")
});

/// A run of word characters and escaped pairs.
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?:\\.|\w)+").expect("token pattern compiles"));

/// An escaped pair, or any single non-word character.
static ESCAPED_OR_NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\.|\W").expect("non-word pattern compiles"));

/// Highest edit distance RediSearch accepts for `%term%` fuzzy matching.
pub const MAX_FUZZY_DISTANCE: u8 = 3;

/// Toggles applied to non-exact condition terms when a query is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchingOptions {
    /// Split terms into words on unescaped non-word characters.
    pub tokenize: bool,
    /// Characters to escape before syntax stripping; these survive as literals.
    pub escape_chars: String,
    /// Add a `term*` alternative.
    pub prefix_matching: bool,
    /// Levenshtein distance for the `%term%` alternative. 0 disables, values above 3 are ignored.
    pub fuzzy_distance: u8,
    /// Weight penalty for prefix and fuzzy alternatives relative to the exact term.
    pub weight_differential: f64,
    /// Terms dropped from lazily built conditions (case-insensitive).
    pub stop_words: Vec<String>,
}

impl Default for MatchingOptions {
    fn default() -> Self {
        Self {
            tokenize: false,
            escape_chars: String::new(),
            prefix_matching: false,
            fuzzy_distance: 0,
            weight_differential: 0.0,
            stop_words: Vec::new(),
        }
    }
}

impl MatchingOptions {
    /// Effective fuzzy distance, `None` when fuzzy matching is off or misconfigured.
    #[inline]
    pub fn effective_fuzzy_distance(&self) -> Option<usize> {
        match self.fuzzy_distance {
            d @ 1..=MAX_FUZZY_DISTANCE => Some(usize::from(d)),
            _ => None,
        }
    }

    /// Weight given to prefix and fuzzy alternatives, `None` when they share the base weight.
    pub fn alternative_weight(&self) -> Option<f64> {
        if self.weight_differential > 0.0 {
            Some((1.0 - self.weight_differential).clamp(0.1, 1.0))
        } else {
            None
        }
    }
}

/// Run the full matching pipeline over a term list.
///
/// Returns an empty vector when nothing survives, so the caller can drop the condition.
pub fn apply_matching<S: AsRef<str>>(terms: &[S], options: &MatchingOptions) -> Vec<String> {
    let mut words = Vec::with_capacity(terms.len());
    for term in terms {
        let term = escape_chars(term.as_ref(), &options.escape_chars);
        if options.tokenize {
            words.extend(tokenize(&term));
        } else {
            words.push(term);
        }
    }

    let words: Vec<String> = words
        .into_iter()
        .map(|word| strip_syntax(&word).trim().to_string())
        .filter(|word| !word.is_empty())
        .collect();

    trim_stop_words(words, &options.stop_words)
        .iter()
        .map(|word| expand_term(word, options))
        .collect()
}

/// Prefix every character of `set` in `term` with a backslash.
///
/// Pairs that are already escaped are copied unchanged, so escaping twice is a no-op.
///
/// ```
/// use ftquery::query::escape_chars;
///
/// assert_eq!(escape_chars("user-name", "-"), "user\\-name");
/// assert_eq!(escape_chars("user\\-name", "-"), "user\\-name");
/// assert_eq!(escape_chars("plain", "-@"), "plain");
/// ```
pub fn escape_chars(term: &str, set: &str) -> String {
    if set.is_empty() {
        return term.to_string();
    }

    let mut escaped = String::with_capacity(term.len());
    let mut chars = term.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            escaped.push(ch);
            if let Some(next) = chars.next() {
                escaped.push(next);
            }
        } else if set.contains(ch) {
            escaped.push('\\');
            escaped.push(ch);
        } else {
            escaped.push(ch);
        }
    }
    escaped
}

/// Split a term into words on unescaped non-word characters.
///
/// ```
/// use ftquery::query::tokenize;
///
/// assert_eq!(tokenize("cli-kv/data"), vec!["cli", "kv", "data"]);
/// assert_eq!(tokenize("cli\\-kv data"), vec!["cli\\-kv", "data"]);
/// ```
pub fn tokenize(term: &str) -> Vec<String> {
    TOKEN.find_iter(term).map(|m| m.as_str().to_string()).collect()
}

/// Remove every syntax character that is not escaped.
///
/// Characters the caller did not ask [`escape_chars`] to keep are dropped, not escaped.
///
/// ```
/// use ftquery::query::strip_syntax;
///
/// assert_eq!(strip_syntax("hello|world"), "helloworld");
/// assert_eq!(strip_syntax("hello\\|world"), "hello\\|world");
/// assert_eq!(strip_syntax("@title:(x)"), "titlex");
/// ```
pub fn strip_syntax(term: &str) -> String {
    ESCAPED_OR_SYNTAX
        .replace_all(term, |caps: &Captures<'_>| {
            let matched = &caps[0];
            if matched.len() > 1 { matched.to_string() } else { String::new() }
        })
        .into_owned()
}

/// Escape every non-word character that is not already escaped.
pub fn escape_non_word(term: &str) -> String {
    ESCAPED_OR_NON_WORD
        .replace_all(term, |caps: &Captures<'_>| {
            let matched = &caps[0];
            if matched.starts_with('\\') && matched.len() > 1 {
                matched.to_string()
            } else {
                format!("\\{matched}")
            }
        })
        .into_owned()
}

/// Drop terms found in `stop_words`, comparing case-insensitively.
pub fn trim_stop_words(terms: Vec<String>, stop_words: &[String]) -> Vec<String> {
    if stop_words.is_empty() {
        return terms;
    }
    terms
        .into_iter()
        .filter(|term| !stop_words.iter().any(|stop| stop.eq_ignore_ascii_case(term)))
        .collect()
}

/// Build the exact / prefix / fuzzy alternation for one cleaned term.
pub fn expand_term(term: &str, options: &MatchingOptions) -> String {
    let weight = options.alternative_weight();
    let mut forms = vec![term.to_string()];

    if options.prefix_matching {
        forms.push(weighted(format!("{term}*"), weight));
    }

    if let Some(distance) = options.effective_fuzzy_distance() {
        let border = "%".repeat(distance);
        forms.push(weighted(format!("{border}{}{border}", escape_non_word(term)), weight));
    }

    if forms.len() == 1 {
        forms.pop().unwrap_or_default()
    } else {
        format!("({})", forms.join("|"))
    }
}

fn weighted(form: String, weight: Option<f64>) -> String {
    match weight {
        Some(weight) => format!("({form}) => {{ $weight: {}; }}", format_numeric(weight)),
        None => form,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> MatchingOptions {
        MatchingOptions::default()
    }

    #[test]
    fn escaping_without_syntax_characters_is_identity() {
        for term in ["hello", "Straße", "v2", "snake_case"] {
            assert_eq!(escape_chars(term, SYNTAX_CHARS), term);
        }
    }

    #[test]
    fn stripping_never_removes_escaped_characters() {
        let escaped = escape_chars("a-b|c@d", "-|@");
        assert_eq!(escaped, "a\\-b\\|c\\@d");
        assert_eq!(strip_syntax(&escaped), escaped);
    }

    #[test]
    fn stripping_removes_bare_operators_and_trailing_backslash() {
        assert_eq!(strip_syntax("-excluded"), "excluded");
        assert_eq!(strip_syntax("{tag}"), "tag");
        assert_eq!(strip_syntax("dangling\\"), "dangling");
    }

    #[test]
    fn tokenize_keeps_escaped_pairs_inside_words() {
        assert_eq!(tokenize("e\\-mail, phone"), vec!["e\\-mail", "phone"]);
        assert!(tokenize("--").is_empty());
    }

    #[test]
    fn escape_non_word_skips_existing_escapes() {
        assert_eq!(escape_non_word("a.b"), "a\\.b");
        assert_eq!(escape_non_word("a\\.b"), "a\\.b");
    }

    #[test]
    fn stop_words_are_case_insensitive() {
        let terms = vec!["The".to_string(), "dragon".to_string()];
        assert_eq!(trim_stop_words(terms, &["the".to_string()]), vec!["dragon"]);
    }

    #[test]
    fn plain_term_has_single_form() {
        assert_eq!(expand_term("dragon", &options()), "dragon");
    }

    #[test]
    fn prefix_and_fuzzy_forms_are_alternated() {
        let opts = MatchingOptions {
            prefix_matching: true,
            fuzzy_distance: 2,
            ..options()
        };
        assert_eq!(expand_term("dragon", &opts), "(dragon|dragon*|%%dragon%%)");
    }

    #[test]
    fn weight_differential_penalizes_alternatives() {
        let opts = MatchingOptions {
            prefix_matching: true,
            weight_differential: 0.5,
            ..options()
        };
        assert_eq!(
            expand_term("dragon", &opts),
            "(dragon|(dragon*) => { $weight: 0.5; })"
        );
    }

    #[test]
    fn out_of_range_fuzzy_distance_disables_fuzzy() {
        let opts = MatchingOptions {
            fuzzy_distance: 7,
            ..options()
        };
        assert_eq!(opts.effective_fuzzy_distance(), None);
        assert_eq!(expand_term("dragon", &opts), "dragon");
    }

    #[test]
    fn pipeline_drops_terms_that_strip_to_nothing() {
        let result = apply_matching(&["***", "  ", "ok"], &options());
        assert_eq!(result, vec!["ok"]);
    }

    #[test]
    fn pipeline_tokenizes_then_expands_each_word() {
        let opts = MatchingOptions {
            tokenize: true,
            prefix_matching: true,
            ..options()
        };
        assert_eq!(
            apply_matching(&["red-dragon"], &opts),
            vec!["(red|red*)", "(dragon|dragon*)"]
        );
    }
}
