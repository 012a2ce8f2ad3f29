use anyhow::{Context, Result};
use clap::Args;
use ftquery::command::AggregateCommand;
use ftquery::errors::FtError;
use ftquery::transport::{RecordingTransport, RedisTransport};

use super::parse_sort;
use crate::context::CommandContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Grouping",
        commands: &[
            "ftquery aggregate -i books --group-by author --reduce 'count AS books'",
            "ftquery aggregate -i sales --group-by brand --reduce 'sum @price AS revenue' --sort-by revenue:desc",
        ],
    },
    ExampleGroup {
        title: "Projections",
        commands: &["ftquery aggregate -i sales --apply '@price * 1.2 AS gross' --filter '@gross > 100'"],
    },
];

#[derive(Args, Debug)]
pub struct AggregateArgs {
    /// Index to aggregate (defaults to [search] index in ftquery.toml)
    #[arg(short, long)]
    pub index: Option<String>,

    /// Query selecting the rows to aggregate
    #[arg(default_value = "*")]
    pub query: String,

    /// Properties to group by (comma separated)
    #[arg(long, value_delimiter = ',')]
    pub group_by: Vec<String>,

    /// Reducer, repeatable
    #[arg(long, value_name = "FUNCTION [ARG..] [AS ALIAS]")]
    pub reduce: Vec<String>,

    /// Computed property, repeatable
    #[arg(long, value_name = "EXPR AS ALIAS")]
    pub apply: Vec<String>,

    /// Row filter expression, repeatable
    #[arg(long)]
    pub filter: Vec<String>,

    /// Sort key, repeatable
    #[arg(long, value_name = "FIELD[:asc|desc]")]
    pub sort_by: Vec<String>,

    /// Maximum number of rows to return
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of rows to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,
}

/// Split `FUNCTION [ARG..] [AS ALIAS]` into its parts.
fn parse_reduce(spec: &str) -> Result<(&str, Vec<&str>, Option<&str>), FtError> {
    let words: Vec<&str> = spec.split_whitespace().collect();
    let Some((function, rest)) = words.split_first() else {
        return Err(FtError::invalid_argument("Empty --reduce specification"));
    };
    match rest.iter().position(|word| word.eq_ignore_ascii_case("AS")) {
        Some(at) if at + 2 == rest.len() => Ok((*function, rest[..at].to_vec(), Some(rest[at + 1]))),
        Some(_) => Err(FtError::invalid_argument(format!("Expected a single alias after AS in {}", spec))),
        None => Ok((*function, rest.to_vec(), None)),
    }
}

/// Split `EXPR AS ALIAS` at the last ` AS `.
fn parse_apply(spec: &str) -> Result<(&str, &str), FtError> {
    spec.rsplit_once(" AS ")
        .or_else(|| spec.rsplit_once(" as "))
        .map(|(expr, alias)| (expr.trim(), alias.trim()))
        .filter(|(expr, alias)| !expr.is_empty() && !alias.is_empty())
        .ok_or_else(|| FtError::invalid_argument(format!("Expected EXPR AS ALIAS, got {}", spec)))
}

impl AggregateArgs {
    pub fn command(&self, index: &str) -> Result<AggregateCommand> {
        let mut command = AggregateCommand::new(index);
        if let Some(limit) = self.limit {
            command = command.limit(self.offset, limit);
        }
        for spec in &self.sort_by {
            let (field, order) = parse_sort(spec)?;
            command = command.sort_by(field, order);
        }
        for filter in &self.filter {
            command = command.filter(filter.as_str());
        }
        command = command.group_by(&self.group_by);
        for spec in &self.reduce {
            let (function, args, alias) = parse_reduce(spec)?;
            command = command.reduce(function, args, alias)?;
        }
        for spec in &self.apply {
            let (expression, alias) = parse_apply(spec)?;
            command = command.apply(expression, alias);
        }
        Ok(command)
    }
}

pub async fn handle_aggregate(args: AggregateArgs, ctx: &CommandContext, output: &OutputManager) -> Result<()> {
    let index = ctx.index(args.index.as_deref())?;
    let command = args.command(&index)?;

    if !args.group_by.is_empty() && args.reduce.is_empty() {
        output.warning("--group-by has no effect without --reduce");
    }

    if ctx.dry_run {
        let mut transport = RecordingTransport::new();
        command.aggregate(&mut transport, args.query.as_str()).await?;
        return output.display_commands(transport.sent());
    }

    let mut conn = ctx.connect(output).await?;
    let mut transport = RedisTransport::new(&mut conn);
    let result = command
        .aggregate(&mut transport, args.query.as_str())
        .await
        .with_context(|| format!("Aggregate on {} failed", index))?;
    output.display_result(&result, ctx.output_mode())
}
