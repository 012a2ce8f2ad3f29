//! # RediSearch Command Assembly
//!
//! Builders that freeze a query plus option flags into the exact ordered argument
//! list of one `FT.*` command:
//!
//! | Builder               | Command         | Reply decoded into                  |
//! |-----------------------|-----------------|-------------------------------------|
//! | [`SearchCommand`]     | `FT.SEARCH`     | `SearchResult<Document>`            |
//! | [`SearchCommand`]     | `FT.EXPLAIN`    | `String`                            |
//! | [`AggregateCommand`]  | `FT.AGGREGATE`  | `SearchResult<Document>` (no ids)   |
//! | [`SpellcheckCommand`] | `FT.SPELLCHECK` | `SearchResult<SpellcheckTerm>`      |
//!
//! Options that were never set contribute nothing to the argument list. Validation
//! (geo units, reducer names) happens in the setter, so a bad value fails before any
//! command is sent.
//!
//! [`Document`]: crate::reply::Document
//! [`SpellcheckTerm`]: crate::reply::SpellcheckTerm

mod aggregate;
mod search;
mod spellcheck;

use std::borrow::Cow;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::errors::FtError;
use crate::query::ConditionTree;

pub use aggregate::{AggregateCommand, Reducer};
pub use search::{GeoUnit, Highlight, SearchCommand, Summarize};
pub use spellcheck::{SpellcheckCommand, TermsMode};

pub const FT_SEARCH: &str = "FT.SEARCH";
pub const FT_EXPLAIN: &str = "FT.EXPLAIN";
pub const FT_AGGREGATE: &str = "FT.AGGREGATE";
pub const FT_SPELLCHECK: &str = "FT.SPELLCHECK";

/// The query argument of a command: either a ready string or a tree built on demand.
#[derive(Debug, Clone)]
pub enum Query<'a> {
    Raw(Cow<'a, str>),
    Tree(&'a ConditionTree),
}

impl Query<'_> {
    /// Produce the query string once for the command being built.
    pub fn resolve(&self) -> String {
        match self {
            Query::Raw(raw) => raw.to_string(),
            Query::Tree(tree) => tree.build(),
        }
    }
}

impl<'a> From<&'a str> for Query<'a> {
    fn from(value: &'a str) -> Self {
        Query::Raw(Cow::Borrowed(value))
    }
}

impl<'a> From<&'a String> for Query<'a> {
    fn from(value: &'a String) -> Self {
        Query::Raw(Cow::Borrowed(value.as_str()))
    }
}

impl From<String> for Query<'_> {
    fn from(value: String) -> Self {
        Query::Raw(Cow::Owned(value))
    }
}

impl<'a> From<&'a ConditionTree> for Query<'a> {
    fn from(value: &'a ConditionTree) -> Self {
        Query::Tree(value)
    }
}

#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(FtError::invalid_argument(format!("Unsupported sort order: {}", other))),
        }
    }
}

/// `LIMIT offset num`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limit {
    pub offset: u64,
    pub num: u64,
}

impl Limit {
    /// Limit for a 1-based page of `page_size` results. Offsets past `u64::MAX` saturate.
    #[inline]
    pub fn page(page: u64, page_size: u64) -> Self {
        Self {
            offset: page.max(1).saturating_sub(1).saturating_mul(page_size),
            num: page_size,
        }
    }

    fn push_to(&self, args: &mut Vec<String>) {
        args.push("LIMIT".to_string());
        args.push(self.offset.to_string());
        args.push(self.num.to_string());
    }
}

/// Push `keyword n item1 .. itemN`.
pub(crate) fn push_counted(args: &mut Vec<String>, keyword: &str, items: &[String]) {
    args.push(keyword.to_string());
    args.push(items.len().to_string());
    args.extend(items.iter().cloned());
}

/// Aggregation properties are referenced as `@name`.
pub(crate) fn property(name: &str) -> String {
    if name.starts_with('@') {
        name.to_string()
    } else {
        format!("@{}", name)
    }
}
