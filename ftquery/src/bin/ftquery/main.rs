mod commands;
mod context;
mod examples;
mod output;
mod theme;

use std::fmt::Write;
use std::io::{self, Write as IoWrite};
use std::path::PathBuf;

use anyhow::Result;
use clap::{
    ColorChoice, Command, CommandFactory, FromArgMatches, Parser, Subcommand,
    builder::{
        Styles,
        styling::{AnsiColor, Color as ClapColor, RgbColor, Style},
    },
    error::ErrorKind,
};
use colored::{Color as ThemeColor, control::ShouldColorize};

use commands::{
    aggregate::{AggregateArgs, handle_aggregate},
    explain::{ExplainArgs, handle_explain},
    search::{SearchArgs, handle_search},
    spellcheck::{SpellcheckArgs, handle_spellcheck},
};
use context::CommandContext;
use examples::{ExampleGroup, command_examples};
use output::{GlobalOptions, OutputFormat, OutputManager};
use theme::{Tone, line, paint};

const ENVIRONMENT_VARIABLES: &[(&str, &str)] = &[
    ("REDIS_URL", "Redis connection URL (default for [redis] url)"),
    ("RUST_LOG", "Log filter, e.g. ftquery=debug to print every command sent"),
];

#[derive(Parser)]
#[command(name = "ftquery")]
#[command(version)]
#[command(
    about = "Build and run RediSearch queries from the command line",
    long_about = r#"Build and run RediSearch queries from the command line.

Terms and flags are turned into a query string and the exact FT.* argument
list; replies are decoded into documents and printed as a table or JSON.

Commands:
  search      FT.SEARCH with condition, filter and paging flags
  aggregate   FT.AGGREGATE with GROUPBY/REDUCE, APPLY and FILTER
  spellcheck  FT.SPELLCHECK suggestions for a query
  explain     FT.EXPLAIN execution plan for a built query
"#
)]
#[command(subcommand_required = true, arg_required_else_help = true)]
struct Cli {
    /// Configuration file (defaults to ./ftquery.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table", global = true)]
    output: OutputFormat,

    /// Render JSON documents as [name, value] pairs instead of objects
    #[arg(long, global = true)]
    pairs: bool,

    /// Suppress output (only errors will be shown)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Print the command that would be sent instead of connecting
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search an index
    Search(SearchArgs),

    /// Group, reduce and project indexed documents
    Aggregate(AggregateArgs),

    /// Suggest corrections for misspelled query terms
    Spellcheck(SpellcheckArgs),

    /// Show how the engine would execute a query
    Explain(ExplainArgs),
}

impl Cli {
    fn parse_with_styles() -> Self {
        let command = build_cli_command();
        match command.styles(help_styles()).try_get_matches() {
            Ok(matches) => match Cli::from_arg_matches(&matches) {
                Ok(cli) => cli,
                Err(err) => err.exit(),
            },
            Err(err) => match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                    let _ = print_blank_line_stdout();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display help: {print_err}");
                    }
                    let _ = print_blank_line_stdout();
                    std::process::exit(0);
                }
                _ => {
                    let exit_code = err.exit_code();
                    let _ = print_blank_line_stderr();
                    if let Err(print_err) = err.print()
                        && print_err.kind() != io::ErrorKind::BrokenPipe
                    {
                        eprintln!("Failed to display error: {print_err}");
                    }
                    let _ = print_blank_line_stderr();
                    std::process::exit(exit_code);
                }
            },
        }
    }
}

fn build_cli_command() -> Command {
    let use_color = detect_color_support();
    let appendix = render_top_level_appendix(use_color);
    let mut command = Cli::command().after_long_help(appendix);
    command = command.color(if use_color {
        ColorChoice::Auto
    } else {
        ColorChoice::Never
    });
    attach_command_examples(&mut command, use_color);
    command
}

fn attach_command_examples(command: &mut Command, use_color: bool) {
    for example in command_examples() {
        if let Some(subcommand) = command.find_subcommand_mut(example.name) {
            let help_text = render_examples(example.groups, use_color);
            *subcommand = subcommand.clone().after_long_help(help_text);
        }
    }
}

fn render_examples(groups: &[ExampleGroup], use_color: bool) -> String {
    let mut buffer = String::new();

    let heading = paint("Examples:", Tone::Heading, use_color);
    let _ = writeln!(buffer, "{heading}");

    for (index, group) in groups.iter().enumerate() {
        let title = paint(group.title, Tone::Title, use_color);
        let _ = writeln!(buffer, "  {title}");

        for command in group.commands {
            let _ = writeln!(buffer, "    {}", line(command, Tone::Example, use_color));
        }

        if index + 1 < groups.len() {
            buffer.push('\n');
        }
    }

    buffer
}

fn render_top_level_appendix(use_color: bool) -> String {
    let mut buffer = String::new();

    let env_heading = paint("Environment Variables:", Tone::Heading, use_color);
    let _ = writeln!(buffer, "{env_heading}");
    for (key, description) in ENVIRONMENT_VARIABLES {
        let key_text = paint(key, Tone::EnvKey, use_color);
        let value_text = paint(description, Tone::EnvDescription, use_color);
        let _ = writeln!(buffer, "  {key_text}  {value_text}");
    }

    buffer.push('\n');

    let tip_heading = paint("Tip:", Tone::Heading, use_color);
    let tip_text = paint(
        "Add --dry-run to any command to print the FT.* arguments without connecting.",
        Tone::Example,
        use_color,
    );
    let _ = writeln!(buffer, "{tip_heading} {tip_text}");

    buffer
}

fn print_blank_line_stdout() -> io::Result<()> {
    let mut stdout = io::stdout();
    IoWrite::write_all(&mut stdout, b"\n")?;
    IoWrite::flush(&mut stdout)
}

fn print_blank_line_stderr() -> io::Result<()> {
    let mut stderr = io::stderr();
    IoWrite::write_all(&mut stderr, b"\n")?;
    IoWrite::flush(&mut stderr)
}

fn detect_color_support() -> bool {
    ShouldColorize::from_env().should_colorize()
}

fn help_styles() -> Styles {
    Styles::styled()
        .usage(style_from_color(Tone::Title.color()).bold())
        .header(style_from_color(Tone::Heading.color()).bold())
        .literal(style_from_color(Tone::Example.color()))
        .placeholder(style_from_color(Tone::Placeholder.color()))
        .valid(style_from_color(Tone::Success.color()))
        .invalid(style_from_color(Tone::Warning.color()))
        .error(style_from_color(Tone::Failure.color()).bold())
}

fn style_from_color(color: ThemeColor) -> Style {
    Style::new().fg_color(Some(color_to_clap_color(color)))
}

fn color_to_clap_color(color: ThemeColor) -> ClapColor {
    match color {
        ThemeColor::Black => ClapColor::Ansi(AnsiColor::Black),
        ThemeColor::Red => ClapColor::Ansi(AnsiColor::Red),
        ThemeColor::Green => ClapColor::Ansi(AnsiColor::Green),
        ThemeColor::Yellow => ClapColor::Ansi(AnsiColor::Yellow),
        ThemeColor::Blue => ClapColor::Ansi(AnsiColor::Blue),
        ThemeColor::Magenta => ClapColor::Ansi(AnsiColor::Magenta),
        ThemeColor::Cyan => ClapColor::Ansi(AnsiColor::Cyan),
        ThemeColor::White => ClapColor::Ansi(AnsiColor::White),
        ThemeColor::BrightBlack => ClapColor::Ansi(AnsiColor::BrightBlack),
        ThemeColor::BrightRed => ClapColor::Ansi(AnsiColor::BrightRed),
        ThemeColor::BrightGreen => ClapColor::Ansi(AnsiColor::BrightGreen),
        ThemeColor::BrightYellow => ClapColor::Ansi(AnsiColor::BrightYellow),
        ThemeColor::BrightBlue => ClapColor::Ansi(AnsiColor::BrightBlue),
        ThemeColor::BrightMagenta => ClapColor::Ansi(AnsiColor::BrightMagenta),
        ThemeColor::BrightCyan => ClapColor::Ansi(AnsiColor::BrightCyan),
        ThemeColor::BrightWhite => ClapColor::Ansi(AnsiColor::BrightWhite),
        ThemeColor::TrueColor { r, g, b } => ClapColor::Rgb(RgbColor(r, g, b)),
    }
}

#[tokio::main]
async fn main() {
    env_logger::init();

    let cli = Cli::parse_with_styles();
    if cli.no_color {
        colored::control::set_override(false);
    }

    let output = OutputManager::new(GlobalOptions {
        output_format: cli.output.clone(),
        quiet: cli.quiet,
        no_color: cli.no_color,
    });

    if let Err(err) = execute(cli, &output).await {
        output.error(&format!("{err:#}"));
        std::process::exit(1);
    }
}

async fn execute(cli: Cli, output: &OutputManager) -> Result<()> {
    let ctx = CommandContext::load(cli.config.as_ref(), cli.dry_run, cli.pairs)?;

    match cli.command {
        Commands::Search(args) => handle_search(args, &ctx, output).await?,
        Commands::Aggregate(args) => handle_aggregate(args, &ctx, output).await?,
        Commands::Spellcheck(args) => handle_spellcheck(args, &ctx, output).await?,
        Commands::Explain(args) => handle_explain(args, &ctx, output).await?,
    }

    Ok(())
}
