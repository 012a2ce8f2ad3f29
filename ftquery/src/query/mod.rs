//! # RediSearch Query Construction
//!
//! [`ConditionTree`] turns a boolean tree of full-text ("generic") and field-scoped
//! conditions into one query-language string.
//!
//! ## Condition Kinds
//!
//! | Call                                          | Stored as           | Built as                      |
//! |-----------------------------------------------|---------------------|-------------------------------|
//! | `add_generic_condition(["a", "b"], Or, true)` | literal `a\|b`      | `a\|b`                        |
//! | `add_generic_condition(["a"], And, false)`    | lazy term list      | matching transforms, then `a` |
//! | `add_condition("title", ["a"], And, false)`   | lazy, per field     | `(@title:a)`                  |
//! | `add_subcondition(tree)`                      | nested tree         | `(<tree>)` or dropped         |
//!
//! Lazy conditions pick up the tree's [`MatchingOptions`] at build time, so toggling
//! prefix or fuzzy matching after adding conditions still affects them.
//!
//! ## Example
//!
//! ```
//! use ftquery::query::{ConditionTree, Conjunction};
//!
//! let mut tree = ConditionTree::default();
//! tree.add_generic_condition(["hello", "world"], Conjunction::Or, true);
//! tree.add_condition("title", ["dragon"], Conjunction::And, false);
//! tree.set_prefix_matching(true);
//!
//! assert_eq!(tree.build(), "hello|world (@title:(dragon|dragon*))");
//! ```

mod matching;

use std::fmt;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::errors::{FtError, FtResult};

pub use matching::{
    MAX_FUZZY_DISTANCE, MatchingOptions, SYNTAX_CHARS, apply_matching, escape_chars, escape_non_word, expand_term,
    strip_syntax, tokenize, trim_stop_words,
};

/// Wildcard substituted for an empty top-level query.
pub const MATCH_ALL: &str = "*";

/// Boolean operator joining conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Conjunction {
    #[default]
    #[serde(alias = "and")]
    And,
    #[serde(alias = "or")]
    Or,
}

impl Conjunction {
    /// Protocol token placed between joined clauses.
    #[inline]
    pub const fn token(self) -> &'static str {
        match self {
            Conjunction::And => " ",
            Conjunction::Or => "|",
        }
    }

    /// Lenient lookup: anything other than `OR` (any case) is AND.
    pub fn from_name(name: &str) -> Self {
        if name.trim().eq_ignore_ascii_case("or") {
            Conjunction::Or
        } else {
            Conjunction::And
        }
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Conjunction::And => f.write_str("AND"),
            Conjunction::Or => f.write_str("OR"),
        }
    }
}

/// Parameters a [`ConditionTree`] is constructed with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeOptions {
    /// Operator joining the tree's own clauses.
    pub conjunction: Conjunction,
    /// Replace an empty top-level query with `*`.
    pub all_on_empty: bool,
    #[serde(flatten)]
    pub matching: MatchingOptions,
}

impl Default for TreeOptions {
    fn default() -> Self {
        Self {
            conjunction: Conjunction::And,
            all_on_empty: true,
            matching: MatchingOptions::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Literal(String),
    Terms { conjunction: Conjunction, terms: Vec<String> },
    Nested(ConditionTree),
}

/// A node of a RediSearch query expression.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConditionTree {
    options: TreeOptions,
    generic: Vec<Condition>,
    fields: Vec<(String, Vec<Condition>)>,
}

impl ConditionTree {
    pub fn new(options: TreeOptions) -> Self {
        Self {
            options,
            generic: Vec::new(),
            fields: Vec::new(),
        }
    }

    /// Default options joined by `conjunction`.
    pub fn with_conjunction(conjunction: Conjunction) -> Self {
        Self::new(TreeOptions {
            conjunction,
            ..TreeOptions::default()
        })
    }

    #[inline]
    pub fn options(&self) -> &TreeOptions {
        &self.options
    }

    /// True when no condition has been added.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.generic.is_empty() && self.fields.is_empty()
    }

    /// Add a full-text clause. Empty `terms` is a no-op.
    ///
    /// With `exact`, terms are joined now and never transformed; otherwise matching
    /// transforms run when the query is built.
    pub fn add_generic_condition<I, S>(&mut self, terms: I, conjunction: Conjunction, exact: bool) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Some(condition) = Self::condition_from(terms, conjunction, exact) {
            self.generic.push(condition);
        }
        self
    }

    /// Add a clause scoped to `field`, emitted as `(@field:...)`. Empty `terms` is a no-op.
    pub fn add_condition<I, S>(
        &mut self,
        field: impl Into<String>,
        terms: I,
        conjunction: Conjunction,
        exact: bool,
    ) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let Some(condition) = Self::condition_from(terms, conjunction, exact) else {
            return self;
        };

        let field = field.into();
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, conditions)) => conditions.push(condition),
            None => self.fields.push((field, vec![condition])),
        }
        self
    }

    /// Nest another tree as a generic condition.
    pub fn add_subcondition(&mut self, tree: ConditionTree) -> &mut Self {
        self.generic.push(Condition::Nested(tree));
        self
    }

    pub fn set_conjunction(&mut self, conjunction: Conjunction) -> &mut Self {
        self.options.conjunction = conjunction;
        self
    }

    pub fn set_all_on_empty(&mut self, value: bool) -> &mut Self {
        self.options.all_on_empty = value;
        self
    }

    pub fn set_tokenize(&mut self, value: bool) -> &mut Self {
        self.options.matching.tokenize = value;
        self
    }

    pub fn set_prefix_matching(&mut self, value: bool) -> &mut Self {
        self.options.matching.prefix_matching = value;
        self
    }

    /// Set the fuzzy edit distance. Values outside 1..=3 leave fuzzy matching off.
    pub fn set_fuzzy_matching(&mut self, distance: u8) -> &mut Self {
        if distance > MAX_FUZZY_DISTANCE {
            warn!("fuzzy distance {distance} is outside 1..={MAX_FUZZY_DISTANCE}; fuzzy matching stays off");
        }
        self.options.matching.fuzzy_distance = distance;
        self
    }

    /// Like [`set_fuzzy_matching`](Self::set_fuzzy_matching) but rejects out-of-range distances.
    pub fn try_set_fuzzy_matching(&mut self, distance: u8) -> FtResult<&mut Self> {
        if !(1..=MAX_FUZZY_DISTANCE).contains(&distance) {
            return Err(FtError::invalid_argument(format!(
                "fuzzy distance must be between 1 and {MAX_FUZZY_DISTANCE}, got {distance}"
            )));
        }
        self.options.matching.fuzzy_distance = distance;
        Ok(self)
    }

    pub fn set_escape_chars(&mut self, chars: impl Into<String>) -> &mut Self {
        self.options.matching.escape_chars = chars.into();
        self
    }

    pub fn set_weight_differential(&mut self, differential: f64) -> &mut Self {
        self.options.matching.weight_differential = differential;
        self
    }

    pub fn set_stop_words<I, S>(&mut self, words: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.matching.stop_words = words.into_iter().map(Into::into).collect();
        self
    }

    /// Build the top-level query string.
    pub fn build(&self) -> String {
        self.build_query(false)
    }

    /// Build as a nested query: an empty tree yields an empty string, never `*`.
    pub fn build_subquery(&self) -> String {
        self.build_query(true)
    }

    fn build_query(&self, subquery: bool) -> String {
        let token = self.options.conjunction.token();
        let mut clauses: Vec<String> = Vec::with_capacity(self.generic.len() + self.fields.len());

        for condition in &self.generic {
            if let Some(clause) = self.resolve(condition)
                && !clauses.contains(&clause)
            {
                clauses.push(clause);
            }
        }

        for (field, conditions) in &self.fields {
            let resolved: Vec<String> = conditions.iter().filter_map(|c| self.resolve(c)).collect();
            if resolved.is_empty() {
                continue;
            }
            clauses.push(format!("(@{}:{})", field, resolved.join(token)));
        }

        let query = clauses.join(token);
        if query.is_empty() && self.options.all_on_empty && !subquery {
            MATCH_ALL.to_string()
        } else {
            query
        }
    }

    fn resolve(&self, condition: &Condition) -> Option<String> {
        match condition {
            Condition::Literal(literal) => (!literal.is_empty()).then(|| literal.clone()),
            Condition::Terms { conjunction, terms } => {
                let expanded = apply_matching(terms, &self.options.matching);
                (!expanded.is_empty()).then(|| expanded.join(conjunction.token()))
            }
            Condition::Nested(tree) => {
                let sub = tree.build_subquery();
                (!sub.is_empty()).then(|| format!("({sub})"))
            }
        }
    }

    fn condition_from<I, S>(terms: I, conjunction: Conjunction, exact: bool) -> Option<Condition>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let terms: Vec<String> = terms.into_iter().map(Into::into).collect();
        if terms.is_empty() {
            return None;
        }
        Some(if exact {
            Condition::Literal(terms.join(conjunction.token()))
        } else {
            Condition::Terms { conjunction, terms }
        })
    }
}

impl fmt::Display for ConditionTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

/// Render a number the way RediSearch expects it in ranges and attributes.
pub(crate) fn format_numeric(value: f64) -> String {
    if value.is_infinite() {
        if value.is_sign_positive() { "+inf".to_string() } else { "-inf".to_string() }
    } else if value.fract() == 0.0 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_generic_condition_is_joined_verbatim() {
        let mut tree = ConditionTree::default();
        tree.add_generic_condition(["a-b", "c*"], Conjunction::Or, true);
        tree.set_prefix_matching(true);
        assert_eq!(tree.build(), "a-b|c*");
    }

    #[test]
    fn duplicate_generic_clauses_are_emitted_once() {
        let mut tree = ConditionTree::default();
        tree.add_generic_condition(["x"], Conjunction::And, true);
        tree.add_generic_condition(["x"], Conjunction::And, true);
        tree.add_generic_condition(["y"], Conjunction::And, true);
        assert_eq!(tree.build(), "x y");
    }

    #[test]
    fn empty_tree_is_wildcard_only_at_top_level() {
        let tree = ConditionTree::default();
        assert_eq!(tree.build(), "*");
        assert_eq!(tree.build_subquery(), "");

        let mut strict = ConditionTree::default();
        strict.set_all_on_empty(false);
        assert_eq!(strict.build(), "");
    }

    #[test]
    fn empty_term_lists_are_dropped() {
        let mut tree = ConditionTree::default();
        tree.add_generic_condition(Vec::<String>::new(), Conjunction::And, false);
        tree.add_condition("title", Vec::<String>::new(), Conjunction::And, true);
        assert!(tree.is_empty());
        assert_eq!(tree.build(), "*");
    }

    #[test]
    fn field_conditions_are_grouped_per_field_in_insertion_order() {
        let mut tree = ConditionTree::with_conjunction(Conjunction::Or);
        tree.add_condition("title", ["dragon"], Conjunction::And, false);
        tree.add_condition("body", ["knight"], Conjunction::And, false);
        tree.add_condition("title", ["castle"], Conjunction::And, false);
        assert_eq!(tree.build(), "(@title:dragon|castle)|(@body:knight)");
    }

    #[test]
    fn field_whose_conditions_strip_to_nothing_is_omitted() {
        let mut tree = ConditionTree::default();
        tree.add_condition("title", ["***"], Conjunction::And, false);
        tree.add_generic_condition(["ok"], Conjunction::And, false);
        assert_eq!(tree.build(), "ok");
    }

    #[test]
    fn subtree_keeps_its_own_conjunction() {
        let mut inner = ConditionTree::with_conjunction(Conjunction::Or);
        inner.add_generic_condition(["red", "blue"], Conjunction::And, true);
        inner.add_generic_condition(["green"], Conjunction::And, true);

        let mut outer = ConditionTree::default();
        outer.add_generic_condition(["paint"], Conjunction::And, true);
        outer.add_subcondition(inner);
        assert_eq!(outer.build(), "paint (red blue|green)");
    }

    #[test]
    fn empty_subtree_is_dropped() {
        let mut outer = ConditionTree::default();
        outer.add_subcondition(ConditionTree::default());
        outer.add_generic_condition(["x"], Conjunction::And, true);
        assert_eq!(outer.build(), "x");
    }

    #[test]
    fn toggles_apply_to_conditions_added_earlier() {
        let mut tree = ConditionTree::default();
        tree.add_generic_condition(["drag"], Conjunction::And, false);
        assert_eq!(tree.build(), "drag");
        tree.set_fuzzy_matching(1);
        assert_eq!(tree.build(), "(drag|%drag%)");
    }

    #[test]
    fn lenient_fuzzy_setter_ignores_bad_distance() {
        let mut tree = ConditionTree::default();
        tree.add_generic_condition(["drag"], Conjunction::And, false);
        tree.set_fuzzy_matching(9);
        assert_eq!(tree.build(), "drag");
    }

    #[test]
    fn strict_fuzzy_setter_rejects_bad_distance() {
        let mut tree = ConditionTree::default();
        assert!(matches!(tree.try_set_fuzzy_matching(0), Err(FtError::InvalidArgument { .. })));
        assert!(matches!(tree.try_set_fuzzy_matching(4), Err(FtError::InvalidArgument { .. })));
        assert!(tree.try_set_fuzzy_matching(3).is_ok());
        assert_eq!(tree.options().matching.fuzzy_distance, 3);
    }

    #[test]
    fn conjunction_lookup_falls_back_to_and() {
        assert_eq!(Conjunction::from_name("or"), Conjunction::Or);
        assert_eq!(Conjunction::from_name("XOR"), Conjunction::And);
        assert_eq!(Conjunction::And.token(), " ");
        assert_eq!(Conjunction::Or.token(), "|");
    }

    #[test]
    fn format_numeric_handles_integers_fractions_and_infinity() {
        assert_eq!(format_numeric(10.0), "10");
        assert_eq!(format_numeric(2.5), "2.5");
        assert_eq!(format_numeric(f64::INFINITY), "+inf");
        assert_eq!(format_numeric(f64::NEG_INFINITY), "-inf");
    }
}
