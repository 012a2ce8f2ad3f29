pub mod aggregate;
pub mod explain;
pub mod search;
pub mod spellcheck;

use clap::Args;
use ftquery::command::{SearchCommand, SortOrder};
use ftquery::errors::{FtError, FtResult};
use ftquery::query::{ConditionTree, Conjunction, TreeOptions};

/// Query-building flags shared by `search` and `explain`.
#[derive(Args, Debug, Clone, Default)]
pub struct QueryArgs {
    /// Index to query (defaults to [search] index in ftquery.toml)
    #[arg(short, long)]
    pub index: Option<String>,

    /// Full-text terms matched across all fields
    pub terms: Vec<String>,

    /// Field-scoped term, repeatable
    #[arg(long = "field", value_name = "NAME=TERM")]
    pub fields: Vec<String>,

    /// Join terms with OR instead of AND
    #[arg(long)]
    pub or: bool,

    /// Use terms verbatim, skipping escaping and expansion
    #[arg(long)]
    pub exact: bool,

    /// Also match terms as prefixes
    #[arg(long)]
    pub prefix: bool,

    /// Also match terms within this edit distance (1-3)
    #[arg(long, value_name = "N")]
    pub fuzzy: Option<u8>,

    /// Split terms into words
    #[arg(long)]
    pub tokenize: bool,

    /// Numeric range filter, repeatable
    #[arg(long, value_name = "FIELD:MIN[:MAX]")]
    pub numeric: Vec<String>,

    /// Geo radius filter, repeatable
    #[arg(long, value_name = "FIELD:LON:LAT:RADIUS:UNIT", allow_hyphen_values = true)]
    pub geo: Vec<String>,
}

impl QueryArgs {
    /// The condition tree described by the terms and matching flags.
    pub fn condition_tree(&self, defaults: TreeOptions) -> FtResult<ConditionTree> {
        let mut tree = ConditionTree::new(defaults);
        let conjunction = if self.or { Conjunction::Or } else { Conjunction::And };

        if self.tokenize {
            tree.set_tokenize(true);
        }
        if self.prefix {
            tree.set_prefix_matching(true);
        }
        if let Some(distance) = self.fuzzy {
            tree.try_set_fuzzy_matching(distance)?;
        }
        if self.or {
            tree.set_conjunction(Conjunction::Or);
        }

        tree.add_generic_condition(&self.terms, conjunction, self.exact);
        for spec in &self.fields {
            let (field, term) = spec
                .split_once('=')
                .filter(|(field, term)| !field.is_empty() && !term.is_empty())
                .ok_or_else(|| FtError::invalid_argument(format!("Expected NAME=TERM, got {}", spec)))?;
            tree.add_condition(field, [term], conjunction, self.exact);
        }
        Ok(tree)
    }

    /// Apply the range filters to a search command.
    pub fn apply_filters(&self, mut command: SearchCommand) -> FtResult<SearchCommand> {
        for spec in &self.numeric {
            let (field, min, max) = parse_numeric(spec)?;
            command = command.numeric_filter(field, min, max);
        }
        for spec in &self.geo {
            let (field, lon, lat, radius, unit) = parse_geo(spec)?;
            command = command.geo_filter(field, lon, lat, radius, unit)?;
        }
        Ok(command)
    }
}

fn parse_number(value: &str, spec: &str) -> FtResult<f64> {
    match value {
        "+inf" | "inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        other => other
            .parse::<f64>()
            .map_err(|_| FtError::invalid_argument(format!("Invalid number {:?} in filter {}", other, spec))),
    }
}

/// `FIELD:MIN[:MAX]`
pub fn parse_numeric(spec: &str) -> FtResult<(&str, f64, Option<f64>)> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [field, min] if !field.is_empty() => Ok((*field, parse_number(min, spec)?, None)),
        [field, min, max] if !field.is_empty() => Ok((*field, parse_number(min, spec)?, Some(parse_number(max, spec)?))),
        _ => Err(FtError::invalid_argument(format!(
            "Expected FIELD:MIN[:MAX] numeric filter, got {}",
            spec
        ))),
    }
}

/// `FIELD:LON:LAT:RADIUS:UNIT`
pub fn parse_geo(spec: &str) -> FtResult<(&str, f64, f64, f64, &str)> {
    let parts: Vec<&str> = spec.split(':').collect();
    match parts.as_slice() {
        [field, lon, lat, radius, unit] if !field.is_empty() => Ok((
            *field,
            parse_number(lon, spec)?,
            parse_number(lat, spec)?,
            parse_number(radius, spec)?,
            *unit,
        )),
        _ => Err(FtError::invalid_argument(format!(
            "Expected FIELD:LON:LAT:RADIUS:UNIT geo filter, got {}",
            spec
        ))),
    }
}

/// `FIELD[:asc|desc]`
pub fn parse_sort(spec: &str) -> FtResult<(&str, SortOrder)> {
    match spec.split_once(':') {
        Some((field, order)) => Ok((field, order.parse()?)),
        None => Ok((spec, SortOrder::Asc)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_filter_specs() {
        assert_eq!(parse_numeric("price:10").unwrap(), ("price", 10.0, None));
        assert_eq!(parse_numeric("price:1.5:20").unwrap(), ("price", 1.5, Some(20.0)));
        assert_eq!(parse_numeric("price:-inf:0").unwrap(), ("price", f64::NEG_INFINITY, Some(0.0)));
        assert!(parse_numeric("price").is_err());
        assert!(parse_numeric("price:cheap").is_err());
    }

    #[test]
    fn geo_filter_specs() {
        assert_eq!(
            parse_geo("loc:-122.4:37.7:5:km").unwrap(),
            ("loc", -122.4, 37.7, 5.0, "km")
        );
        assert!(parse_geo("loc:1:2:5").is_err());
    }

    #[test]
    fn sort_specs() {
        assert_eq!(parse_sort("price").unwrap(), ("price", SortOrder::Asc));
        assert_eq!(parse_sort("price:desc").unwrap(), ("price", SortOrder::Desc));
        assert!(parse_sort("price:up").is_err());
    }

    #[test]
    fn query_args_build_tree() {
        let args = QueryArgs {
            terms: vec!["hello".to_string(), "world".to_string()],
            fields: vec!["title=dune".to_string()],
            or: true,
            exact: true,
            ..QueryArgs::default()
        };
        let tree = args.condition_tree(TreeOptions::default()).unwrap();
        assert_eq!(tree.build(), "hello|world|(@title:dune)");
    }

    #[test]
    fn malformed_field_spec_is_rejected() {
        let args = QueryArgs {
            fields: vec!["title".to_string()],
            ..QueryArgs::default()
        };
        assert!(matches!(
            args.condition_tree(TreeOptions::default()),
            Err(FtError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn fuzzy_out_of_range_is_rejected() {
        let args = QueryArgs {
            terms: vec!["hello".to_string()],
            fuzzy: Some(5),
            ..QueryArgs::default()
        };
        assert!(args.condition_tree(TreeOptions::default()).is_err());
    }
}
