use anyhow::{Context, Result};
use clap::Args;
use ftquery::command::SearchCommand;
use ftquery::transport::{RecordingTransport, RedisTransport};
use redis::Value;

use super::QueryArgs;
use crate::context::CommandContext;
use crate::examples::ExampleGroup;
use crate::output::OutputManager;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Execution Plans",
    commands: &[
        "ftquery explain -i books dune --prefix",
        "ftquery explain -i books --field title=dune --numeric year:1960:1970",
    ],
}];

#[derive(Args, Debug)]
pub struct ExplainArgs {
    #[command(flatten)]
    pub query: QueryArgs,
}

pub async fn handle_explain(args: ExplainArgs, ctx: &CommandContext, output: &OutputManager) -> Result<()> {
    let index = ctx.index(args.query.index.as_deref())?;
    let tree = args.query.condition_tree(ctx.tree_options())?;
    let command = args.query.apply_filters(SearchCommand::new(index.as_str()))?;

    if ctx.dry_run {
        let mut transport = RecordingTransport::new().with_reply(Value::SimpleString(String::new()));
        command.explain(&mut transport, &tree).await?;
        return output.display_commands(transport.sent());
    }

    let mut conn = ctx.connect(output).await?;
    let mut transport = RedisTransport::new(&mut conn);
    let plan = command
        .explain(&mut transport, &tree)
        .await
        .with_context(|| format!("Explain on {} failed", index))?;
    output.text(plan.trim_end());
    Ok(())
}
