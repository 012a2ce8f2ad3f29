use anyhow::{Context, Result};
use clap::Args;
use ftquery::command::SpellcheckCommand;
use ftquery::transport::{RecordingTransport, RedisTransport};

use crate::context::CommandContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Spelling Suggestions",
    commands: &[
        "ftquery spellcheck -i books 'dnue mesiah'",
        "ftquery spellcheck -i books 'dnue' --distance 2 --include authors",
    ],
}];

#[derive(Args, Debug)]
pub struct SpellcheckArgs {
    /// Index whose dictionary is consulted (defaults to [search] index in ftquery.toml)
    #[arg(short, long)]
    pub index: Option<String>,

    /// Query to check
    pub query: String,

    /// Maximum Levenshtein distance for suggestions (1-4)
    #[arg(long)]
    pub distance: Option<u8>,

    /// Dictionary whose terms are also suggested, repeatable
    #[arg(long)]
    pub include: Vec<String>,

    /// Dictionary whose terms are never suggested, repeatable
    #[arg(long)]
    pub exclude: Vec<String>,
}

impl SpellcheckArgs {
    pub fn command(&self, index: &str) -> SpellcheckCommand {
        let mut command = SpellcheckCommand::new(index);
        if let Some(distance) = self.distance {
            command = command.distance(distance);
        }
        for dictionary in &self.include {
            command = command.include_terms(dictionary.as_str());
        }
        for dictionary in &self.exclude {
            command = command.exclude_terms(dictionary.as_str());
        }
        command
    }
}

pub async fn handle_spellcheck(args: SpellcheckArgs, ctx: &CommandContext, output: &OutputManager) -> Result<()> {
    let index = ctx.index(args.index.as_deref())?;
    let command = args.command(&index);

    if ctx.dry_run {
        let mut transport = RecordingTransport::new();
        command.spellcheck(&mut transport, args.query.as_str()).await?;
        return output.display_commands(transport.sent());
    }

    let mut conn = ctx.connect(output).await?;
    let mut transport = RedisTransport::new(&mut conn);
    let result = command
        .spellcheck(&mut transport, args.query.as_str())
        .await
        .with_context(|| format!("Spellcheck on {} failed", index))?;

    if result.is_empty() {
        output.success("No misspelled terms");
        return Ok(());
    }
    output.display_result(&result, ctx.output_mode())
}
