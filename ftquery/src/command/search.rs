use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::errors::{FtError, FtResult};
use crate::query::format_numeric;
use crate::reply::{Document, ReplyLayout, SearchResult, decode_search, value_to_string};
use crate::transport::Transport;

use super::{FT_EXPLAIN, FT_SEARCH, Limit, Query, SortOrder, push_counted};

const DEFAULT_FRAGMENTS: u32 = 3;
const DEFAULT_FRAGMENT_LEN: u32 = 50;
const DEFAULT_SEPARATOR: &str = "...";
const DEFAULT_OPEN_TAG: &str = "<strong>";
const DEFAULT_CLOSE_TAG: &str = "</strong>";

/// Distance units accepted by geo filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeoUnit {
    Meters,
    Kilometers,
    Miles,
    Feet,
}

impl GeoUnit {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            GeoUnit::Meters => "m",
            GeoUnit::Kilometers => "km",
            GeoUnit::Miles => "mi",
            GeoUnit::Feet => "ft",
        }
    }
}

impl FromStr for GeoUnit {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "m" => Ok(GeoUnit::Meters),
            "km" => Ok(GeoUnit::Kilometers),
            "mi" => Ok(GeoUnit::Miles),
            "ft" => Ok(GeoUnit::Feet),
            other => Err(FtError::invalid_argument(format!(
                "Unsupported geo distance unit: {} (expected m, km, mi or ft)",
                other
            ))),
        }
    }
}

impl fmt::Display for GeoUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `SUMMARIZE [FIELDS n f..] FRAGS k LEN l SEPARATOR s`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summarize {
    pub fields: Vec<String>,
    pub fragments: u32,
    pub fragment_len: u32,
    pub separator: String,
}

impl Summarize {
    /// Summarize the given fields (all fields when empty) with default fragment settings.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            fragments: DEFAULT_FRAGMENTS,
            fragment_len: DEFAULT_FRAGMENT_LEN,
            separator: DEFAULT_SEPARATOR.to_string(),
        }
    }

    #[inline]
    pub fn fragments(mut self, fragments: u32) -> Self {
        self.fragments = fragments;
        self
    }

    #[inline]
    pub fn fragment_len(mut self, fragment_len: u32) -> Self {
        self.fragment_len = fragment_len;
        self
    }

    #[inline]
    pub fn separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    fn push_to(&self, args: &mut Vec<String>) {
        args.push("SUMMARIZE".to_string());
        if !self.fields.is_empty() {
            push_counted(args, "FIELDS", &self.fields);
        }
        args.extend([
            "FRAGS".to_string(),
            self.fragments.to_string(),
            "LEN".to_string(),
            self.fragment_len.to_string(),
            "SEPARATOR".to_string(),
            self.separator.clone(),
        ]);
    }
}

/// `HIGHLIGHT [FIELDS n f..] TAGS open close`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    pub fields: Vec<String>,
    pub open_tag: String,
    pub close_tag: String,
}

impl Highlight {
    /// Highlight the given fields (all fields when empty) with `<strong>` tags.
    pub fn fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            open_tag: DEFAULT_OPEN_TAG.to_string(),
            close_tag: DEFAULT_CLOSE_TAG.to_string(),
        }
    }

    #[inline]
    pub fn tags(mut self, open: impl Into<String>, close: impl Into<String>) -> Self {
        self.open_tag = open.into();
        self.close_tag = close.into();
        self
    }

    fn push_to(&self, args: &mut Vec<String>) {
        args.push("HIGHLIGHT".to_string());
        if !self.fields.is_empty() {
            push_counted(args, "FIELDS", &self.fields);
        }
        args.extend(["TAGS".to_string(), self.open_tag.clone(), self.close_tag.clone()]);
    }
}

/// Option set for `FT.SEARCH` against one index.
///
/// ```
/// use ftquery::command::{SearchCommand, SortOrder};
///
/// let args = SearchCommand::new("idx")
///     .limit(0, 10)
///     .with_scores()
///     .sort_by("price", SortOrder::Desc)
///     .numeric_filter("price", 10.0, None)
///     .build_args("shoes");
///
/// assert_eq!(
///     args,
///     ["idx", "shoes @price:[10 +inf]", "LIMIT", "0", "10", "WITHSCORES", "SORTBY", "price", "DESC"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SearchCommand {
    index: String,
    limit: Option<Limit>,
    slop: Option<u32>,
    verbatim: bool,
    with_scores: bool,
    with_sort_keys: bool,
    with_payloads: bool,
    no_stop_words: bool,
    no_content: bool,
    in_fields: Vec<String>,
    in_keys: Vec<String>,
    return_fields: Option<Vec<String>>,
    summarize: Option<Summarize>,
    highlight: Option<Highlight>,
    sort_by: Option<(String, SortOrder)>,
    scorer: Option<String>,
    language: Option<String>,
    expander: Option<String>,
    payload: Option<String>,
    numeric_filters: Vec<String>,
    geo_filters: Vec<String>,
}

impl SearchCommand {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            limit: None,
            slop: None,
            verbatim: false,
            with_scores: false,
            with_sort_keys: false,
            with_payloads: false,
            no_stop_words: false,
            no_content: false,
            in_fields: Vec::new(),
            in_keys: Vec::new(),
            return_fields: None,
            summarize: None,
            highlight: None,
            sort_by: None,
            scorer: None,
            language: None,
            expander: None,
            payload: None,
            numeric_filters: Vec::new(),
            geo_filters: Vec::new(),
        }
    }

    #[inline]
    pub fn index(&self) -> &str {
        &self.index
    }

    #[inline]
    pub fn limit(mut self, offset: u64, num: u64) -> Self {
        self.limit = Some(Limit { offset, num });
        self
    }

    /// 1-based page of `page_size` results.
    #[inline]
    pub fn page(mut self, page: u64, page_size: u64) -> Self {
        self.limit = Some(Limit::page(page, page_size));
        self
    }

    #[inline]
    pub fn slop(mut self, slop: u32) -> Self {
        self.slop = Some(slop);
        self
    }

    #[inline]
    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }

    #[inline]
    pub fn with_scores(mut self) -> Self {
        self.with_scores = true;
        self
    }

    #[inline]
    pub fn with_sort_keys(mut self) -> Self {
        self.with_sort_keys = true;
        self
    }

    #[inline]
    pub fn with_payloads(mut self) -> Self {
        self.with_payloads = true;
        self
    }

    #[inline]
    pub fn no_stop_words(mut self) -> Self {
        self.no_stop_words = true;
        self
    }

    #[inline]
    pub fn no_content(mut self) -> Self {
        self.no_content = true;
        self
    }

    pub fn in_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn in_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.in_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Limit returned fields. An empty list sends `RETURN 0`, which behaves like NOCONTENT.
    pub fn return_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.return_fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    #[inline]
    pub fn summarize(mut self, summarize: Summarize) -> Self {
        self.summarize = Some(summarize);
        self
    }

    #[inline]
    pub fn highlight(mut self, highlight: Highlight) -> Self {
        self.highlight = Some(highlight);
        self
    }

    #[inline]
    pub fn sort_by(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some((field.into(), order));
        self
    }

    #[inline]
    pub fn scorer(mut self, scorer: impl Into<String>) -> Self {
        self.scorer = Some(scorer.into());
        self
    }

    #[inline]
    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[inline]
    pub fn expander(mut self, expander: impl Into<String>) -> Self {
        self.expander = Some(expander.into());
        self
    }

    #[inline]
    pub fn payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Append `@field:[min max]` to the query; a missing `max` is `+inf`.
    pub fn numeric_filter(mut self, field: &str, min: f64, max: Option<f64>) -> Self {
        let max = max.map(format_numeric).unwrap_or_else(|| "+inf".to_string());
        self.numeric_filters
            .push(format!("@{}:[{} {}]", field, format_numeric(min), max));
        self
    }

    /// Append `@field:[lon lat radius unit]` to the query.
    ///
    /// Fails with [`FtError::InvalidArgument`] unless `unit` is one of `m`, `km`, `mi`, `ft`.
    pub fn geo_filter(mut self, field: &str, longitude: f64, latitude: f64, radius: f64, unit: &str) -> FtResult<Self> {
        let unit: GeoUnit = unit.parse()?;
        self.geo_filters.push(format!(
            "@{}:[{} {} {} {}]",
            field,
            format_numeric(longitude),
            format_numeric(latitude),
            format_numeric(radius),
            unit
        ));
        Ok(self)
    }

    /// The query followed by every accumulated range filter.
    pub fn query_with_filters(&self, query: &str) -> String {
        let mut parts: Vec<&str> = Vec::with_capacity(1 + self.numeric_filters.len() + self.geo_filters.len());
        if !query.trim().is_empty() {
            parts.push(query);
        }
        parts.extend(self.numeric_filters.iter().map(String::as_str));
        parts.extend(self.geo_filters.iter().map(String::as_str));
        parts.join(" ")
    }

    /// Shape of each document in the reply to this command.
    pub fn reply_layout(&self) -> ReplyLayout {
        let returns_nothing = matches!(&self.return_fields, Some(fields) if fields.is_empty());
        ReplyLayout {
            with_ids: true,
            with_scores: self.with_scores,
            with_payloads: self.with_payloads,
            with_sort_keys: self.with_sort_keys,
            no_content: self.no_content || returns_nothing,
        }
    }

    /// Freeze the options into the `FT.SEARCH` argument list (without the command name).
    pub fn build_args<'q>(&self, query: impl Into<Query<'q>>) -> Vec<String> {
        let query = query.into().resolve();
        let mut args = vec![self.index.clone(), self.query_with_filters(&query)];

        if let Some(limit) = &self.limit {
            limit.push_to(&mut args);
        }

        if let Some(slop) = self.slop {
            args.push("SLOP".to_string());
            args.push(slop.to_string());
        }

        let flags = [
            (self.verbatim, "VERBATIM"),
            (self.with_scores, "WITHSCORES"),
            (self.with_sort_keys, "WITHSORTKEYS"),
            (self.with_payloads, "WITHPAYLOADS"),
            (self.no_stop_words, "NOSTOPWORDS"),
            (self.no_content, "NOCONTENT"),
        ];
        args.extend(flags.iter().filter(|(set, _)| *set).map(|(_, flag)| flag.to_string()));

        if !self.in_fields.is_empty() {
            push_counted(&mut args, "INFIELDS", &self.in_fields);
        }
        if !self.in_keys.is_empty() {
            push_counted(&mut args, "INKEYS", &self.in_keys);
        }
        if let Some(fields) = &self.return_fields {
            push_counted(&mut args, "RETURN", fields);
        }
        if let Some(summarize) = &self.summarize {
            summarize.push_to(&mut args);
        }
        if let Some(highlight) = &self.highlight {
            highlight.push_to(&mut args);
        }
        if let Some((field, order)) = &self.sort_by {
            args.extend(["SORTBY".to_string(), field.clone(), order.as_str().to_string()]);
        }

        let keyed = [
            ("SCORER", &self.scorer),
            ("LANGUAGE", &self.language),
            ("EXPANDER", &self.expander),
            ("PAYLOAD", &self.payload),
        ];
        for (keyword, value) in keyed {
            if let Some(value) = value {
                args.push(keyword.to_string());
                args.push(value.clone());
            }
        }

        args
    }

    /// Send `FT.SEARCH` and decode the reply.
    pub async fn search<'q, T>(&self, transport: &mut T, query: impl Into<Query<'q>>) -> FtResult<SearchResult<Document>>
    where
        T: Transport,
    {
        let args = self.build_args(query);
        let raw = transport.send(FT_SEARCH, &args).await?;
        let result = decode_search(&raw, self.reply_layout())?;
        debug!(
            "search on {} matched {} ({} returned)",
            self.index,
            result.total,
            result.documents.len()
        );
        Ok(result)
    }

    /// Send `FT.EXPLAIN` for the query (with range filters) and return the execution plan.
    pub async fn explain<'q, T>(&self, transport: &mut T, query: impl Into<Query<'q>>) -> FtResult<String>
    where
        T: Transport,
    {
        let query = query.into().resolve();
        let args = vec![self.index.clone(), self.query_with_filters(&query)];
        let raw = transport.send(FT_EXPLAIN, &args).await?;
        value_to_string(&raw)
    }
}
