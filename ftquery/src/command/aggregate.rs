use std::fmt;
use std::str::FromStr;

use log::debug;

use crate::errors::{FtError, FtResult};
use crate::reply::{Document, ReplyLayout, SearchResult, decode_search};
use crate::transport::Transport;

use super::{FT_AGGREGATE, Limit, Query, SortOrder, property, push_counted};

/// Aggregation functions accepted inside `GROUPBY ... REDUCE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reducer {
    Count,
    CountDistinct,
    CountDistinctish,
    Sum,
    Min,
    Max,
    Avg,
    Stddev,
    Quantile,
    Tolist,
    FirstValue,
    RandomSample,
}

impl Reducer {
    pub const ALL: [Reducer; 12] = [
        Reducer::Count,
        Reducer::CountDistinct,
        Reducer::CountDistinctish,
        Reducer::Sum,
        Reducer::Min,
        Reducer::Max,
        Reducer::Avg,
        Reducer::Stddev,
        Reducer::Quantile,
        Reducer::Tolist,
        Reducer::FirstValue,
        Reducer::RandomSample,
    ];

    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Reducer::Count => "COUNT",
            Reducer::CountDistinct => "COUNT_DISTINCT",
            Reducer::CountDistinctish => "COUNT_DISTINCTISH",
            Reducer::Sum => "SUM",
            Reducer::Min => "MIN",
            Reducer::Max => "MAX",
            Reducer::Avg => "AVG",
            Reducer::Stddev => "STDDEV",
            Reducer::Quantile => "QUANTILE",
            Reducer::Tolist => "TOLIST",
            Reducer::FirstValue => "FIRST_VALUE",
            Reducer::RandomSample => "RANDOM_SAMPLE",
        }
    }
}

impl FromStr for Reducer {
    type Err = FtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Reducer::ALL
            .into_iter()
            .find(|reducer| reducer.as_str() == upper)
            .ok_or_else(|| FtError::invalid_argument(format!("Unsupported reducer: {}", s)))
    }
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
struct ReduceClause {
    reducer: Reducer,
    args: Vec<String>,
    alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
struct ApplyClause {
    expression: String,
    alias: String,
}

/// Option set for `FT.AGGREGATE` against one index.
///
/// `GROUPBY` is only emitted when at least one reducer was added, and reducers are
/// only emitted under a `GROUPBY`.
///
/// ```
/// use ftquery::command::AggregateCommand;
///
/// let args = AggregateCommand::new("idx")
///     .group_by(["brand"])
///     .reduce("count", Vec::<String>::new(), Some("total"))
///     .expect("COUNT is a known reducer")
///     .build_args("*");
///
/// assert_eq!(args, ["idx", "*", "GROUPBY", "1", "@brand", "REDUCE", "COUNT", "0", "AS", "total"]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateCommand {
    index: String,
    limit: Option<Limit>,
    verbatim: bool,
    with_schema: bool,
    sort_by: Vec<(String, SortOrder)>,
    filters: Vec<String>,
    group_by: Vec<String>,
    reducers: Vec<ReduceClause>,
    applies: Vec<ApplyClause>,
}

impl AggregateCommand {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            limit: None,
            verbatim: false,
            with_schema: false,
            sort_by: Vec::new(),
            filters: Vec::new(),
            group_by: Vec::new(),
            reducers: Vec::new(),
            applies: Vec::new(),
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

    #[inline]
    pub fn verbatim(mut self) -> Self {
        self.verbatim = true;
        self
    }

    #[inline]
    pub fn with_schema(mut self) -> Self {
        self.with_schema = true;
        self
    }

    /// Add a sort key; repeated calls sort by several properties.
    #[inline]
    pub fn sort_by(mut self, field: &str, order: SortOrder) -> Self {
        self.sort_by.push((property(field), order));
        self
    }

    #[inline]
    pub fn filter(mut self, expression: impl Into<String>) -> Self {
        self.filters.push(expression.into());
        self
    }

    pub fn group_by<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.group_by = fields.into_iter().map(|f| property(f.as_ref())).collect();
        self
    }

    /// Add a reducer by name. Unknown names fail immediately with [`FtError::InvalidArgument`].
    pub fn reduce<I, S>(self, function: &str, args: I, alias: Option<&str>) -> FtResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let reducer: Reducer = function.parse()?;
        Ok(self.reduce_with(reducer, args, alias))
    }

    pub fn reduce_with<I, S>(mut self, reducer: Reducer, args: I, alias: Option<&str>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.reducers.push(ReduceClause {
            reducer,
            args: args.into_iter().map(Into::into).collect(),
            alias: alias.map(str::to_string),
        });
        self
    }

    /// `APPLY expression AS alias`; repeated calls are emitted in order.
    #[inline]
    pub fn apply(mut self, expression: impl Into<String>, alias: impl Into<String>) -> Self {
        self.applies.push(ApplyClause {
            expression: expression.into(),
            alias: alias.into(),
        });
        self
    }

    /// Rows of an aggregate reply carry no ids, only a property array.
    #[inline]
    pub fn reply_layout(&self) -> ReplyLayout {
        ReplyLayout::aggregate()
    }

    /// Freeze the options into the `FT.AGGREGATE` argument list.
    pub fn build_args<'q>(&self, query: impl Into<Query<'q>>) -> Vec<String> {
        let mut args = vec![self.index.clone(), query.into().resolve()];

        if let Some(limit) = &self.limit {
            limit.push_to(&mut args);
        }
        if self.verbatim {
            args.push("VERBATIM".to_string());
        }
        if self.with_schema {
            args.push("WITHSCHEMA".to_string());
        }

        if !self.sort_by.is_empty() {
            let keys: Vec<String> = self
                .sort_by
                .iter()
                .flat_map(|(field, order)| [field.clone(), order.as_str().to_string()])
                .collect();
            push_counted(&mut args, "SORTBY", &keys);
        }

        for filter in &self.filters {
            args.push("FILTER".to_string());
            args.push(filter.clone());
        }

        if !self.group_by.is_empty() && !self.reducers.is_empty() {
            push_counted(&mut args, "GROUPBY", &self.group_by);
            for clause in &self.reducers {
                args.push("REDUCE".to_string());
                args.push(clause.reducer.as_str().to_string());
                args.push(clause.args.len().to_string());
                args.extend(clause.args.iter().cloned());
                if let Some(alias) = &clause.alias {
                    args.push("AS".to_string());
                    args.push(alias.clone());
                }
            }
        }

        for apply in &self.applies {
            args.extend([
                "APPLY".to_string(),
                apply.expression.clone(),
                "AS".to_string(),
                apply.alias.clone(),
            ]);
        }

        args
    }

    /// Send `FT.AGGREGATE` and decode each row into a document of properties.
    pub async fn aggregate<'q, T>(
        &self,
        transport: &mut T,
        query: impl Into<Query<'q>>,
    ) -> FtResult<SearchResult<Document>>
    where
        T: Transport,
    {
        let args = self.build_args(query);
        let raw = transport.send(FT_AGGREGATE, &args).await?;
        let result = decode_search(&raw, self.reply_layout())?;
        debug!("aggregate on {} produced {} rows", self.index, result.documents.len());
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reducer_names_are_validated_case_insensitively() {
        assert_eq!("avg".parse::<Reducer>().unwrap(), Reducer::Avg);
        assert_eq!("first_value".parse::<Reducer>().unwrap(), Reducer::FirstValue);
        let err = "median".parse::<Reducer>().expect_err("median is not whitelisted");
        assert!(matches!(err, FtError::InvalidArgument { message } if message.contains("median")));
    }

    #[test]
    fn unknown_reducer_fails_at_configuration_time() {
        let result = AggregateCommand::new("idx").group_by(["brand"]).reduce("explode", ["@x"], None);
        assert!(matches!(result, Err(FtError::InvalidArgument { .. })));
    }

    #[test]
    fn group_by_without_reduce_is_silently_omitted() {
        let args = AggregateCommand::new("idx").group_by(["brand"]).build_args("*");
        assert_eq!(args, ["idx", "*"]);
    }

    #[test]
    fn reduce_without_group_by_is_silently_omitted() {
        let args = AggregateCommand::new("idx")
            .reduce_with(Reducer::Count, Vec::<String>::new(), None)
            .build_args("*");
        assert_eq!(args, ["idx", "*"]);
    }

    #[test]
    fn clauses_follow_protocol_order() {
        let args = AggregateCommand::new("idx")
            .apply("@price * 2", "double")
            .group_by(["@brand", "color"])
            .reduce_with(Reducer::Sum, ["@price"], Some("revenue"))
            .reduce_with(Reducer::Count, Vec::<String>::new(), None)
            .filter("@price > 10")
            .sort_by("price", SortOrder::Desc)
            .with_schema()
            .verbatim()
            .limit(0, 50)
            .build_args("shoes");

        assert_eq!(
            args,
            [
                "idx", "shoes", "LIMIT", "0", "50", "VERBATIM", "WITHSCHEMA", "SORTBY", "2", "@price", "DESC",
                "FILTER", "@price > 10", "GROUPBY", "2", "@brand", "@color", "REDUCE", "SUM", "1", "@price", "AS",
                "revenue", "REDUCE", "COUNT", "0", "APPLY", "@price * 2", "AS", "double",
            ]
        );
    }
}
