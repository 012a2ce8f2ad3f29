use anyhow::{Context, Result};
use clap::Args;
use ftquery::command::SearchCommand;
use ftquery::transport::{RecordingTransport, RedisTransport};

use super::{QueryArgs, parse_sort};
use crate::context::CommandContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Full-text Search",
        commands: &[
            "ftquery search -i books dune                     # Documents matching 'dune'",
            "ftquery search -i books dune messiah --or        # Either term",
            "ftquery search -i books drag --prefix --fuzzy 1  # Prefix and typo-tolerant matching",
        ],
    },
    ExampleGroup {
        title: "Fields and Filters",
        commands: &[
            "ftquery search -i books --field title=dune --return title,year",
            "ftquery search -i books --numeric year:1960:1970 --sort-by year:desc",
            "ftquery search -i shops --geo location:-122.41:37.77:5:km",
        ],
    },
    ExampleGroup {
        title: "Dry Run",
        commands: &["ftquery --dry-run search -i books dune --limit 5   # Print FT.SEARCH without sending"],
    },
];

#[derive(Args, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub query: QueryArgs,

    /// Maximum number of documents to return
    #[arg(long)]
    pub limit: Option<u64>,

    /// Number of documents to skip
    #[arg(long, default_value_t = 0)]
    pub offset: u64,

    /// Include relevance scores
    #[arg(long)]
    pub with_scores: bool,

    /// Return ids only
    #[arg(long)]
    pub no_content: bool,

    /// Fields to return (comma separated)
    #[arg(long = "return", value_delimiter = ',', value_name = "FIELDS")]
    pub return_fields: Option<Vec<String>>,

    /// Sort key
    #[arg(long, value_name = "FIELD[:asc|desc]")]
    pub sort_by: Option<String>,
}

impl SearchArgs {
    pub fn command(&self, index: &str) -> Result<SearchCommand> {
        let mut command = SearchCommand::new(index);
        if let Some(limit) = self.limit {
            command = command.limit(self.offset, limit);
        }
        if self.with_scores {
            command = command.with_scores();
        }
        if self.no_content {
            command = command.no_content();
        }
        if let Some(fields) = &self.return_fields {
            command = command.return_fields(fields.iter().filter(|f| !f.is_empty()).cloned());
        }
        if let Some(spec) = &self.sort_by {
            let (field, order) = parse_sort(spec)?;
            command = command.sort_by(field, order);
        }
        Ok(self.query.apply_filters(command)?)
    }
}

pub async fn handle_search(args: SearchArgs, ctx: &CommandContext, output: &OutputManager) -> Result<()> {
    let index = ctx.index(args.query.index.as_deref())?;
    let tree = args.query.condition_tree(ctx.tree_options())?;
    let command = args.command(&index)?;

    if ctx.dry_run {
        let mut transport = RecordingTransport::new();
        command.search(&mut transport, &tree).await?;
        return output.display_commands(transport.sent());
    }

    let mut conn = ctx.connect(output).await?;
    let mut transport = RedisTransport::new(&mut conn);
    let result = command
        .search(&mut transport, &tree)
        .await
        .with_context(|| format!("Search on {} failed", index))?;
    output.display_result(&result, ctx.output_mode())
}
