use anyhow::Result;
use clap::ValueEnum;
use comfy_table::{Attribute, Cell, Table};
use ftquery::reply::{DocumentView, OutputMode, SearchResult};
use ftquery::transport::SentCommand;
use serde_json::Value;
use std::io::Write;

use crate::theme::{Tone, line};

#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// One line per row
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub no_color: bool,
}

pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    /// Print a decoded result in the configured format.
    pub fn display_result<T: DocumentView>(&self, result: &SearchResult<T>, mode: OutputMode) -> Result<()> {
        if self.options.quiet {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&result.to_json(mode))?);
            }
            OutputFormat::Table => {
                self.info(&format!(
                    "{} total, {} returned",
                    result.total,
                    result.documents.len()
                ));
                if !result.documents.is_empty() {
                    println!("{}", self.result_table(result));
                }
            }
            OutputFormat::Compact => {
                for document in &result.documents {
                    println!("{}", compact_line(document));
                }
            }
        }
        Ok(())
    }

    /// Print the commands a dry run would have sent.
    pub fn display_commands(&self, commands: &[SentCommand]) -> Result<()> {
        match self.options.output_format {
            OutputFormat::Json => {
                let json: Vec<Value> = commands
                    .iter()
                    .map(|command| {
                        let mut argv = vec![Value::String(command.name.clone())];
                        argv.extend(command.args.iter().cloned().map(Value::String));
                        Value::Array(argv)
                    })
                    .collect();
                println!("{}", serde_json::to_string_pretty(&json)?);
            }
            OutputFormat::Table | OutputFormat::Compact => {
                for command in commands {
                    println!("{}", line(&command.to_string(), Tone::Command, self.use_color()));
                }
            }
        }
        Ok(())
    }

    #[inline]
    fn use_color(&self) -> bool {
        !self.options.no_color
    }

    pub fn text(&self, text: &str) {
        if !self.options.quiet {
            println!("{text}");
        }
    }

    pub fn success(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", line(message, Tone::Success, self.use_color()));
        }
    }

    pub fn error(&self, message: &str) {
        eprintln!("{}", line(message, Tone::Failure, self.use_color()));
    }

    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            eprintln!("{}", line(message, Tone::Warning, self.use_color()));
        }
    }

    pub fn info(&self, message: &str) {
        if !self.options.quiet {
            println!("{}", line(message, Tone::Info, self.use_color()));
        }
    }

    pub fn progress(&self, message: &str) {
        if self.options.quiet || self.options.output_format != OutputFormat::Table {
            return;
        }
        print!("\r{}...", line(message, Tone::Progress, self.use_color()));
        std::io::stdout().flush().ok();
    }

    pub fn clear_line(&self) {
        if self.options.quiet || self.options.output_format != OutputFormat::Table {
            return;
        }

        print!("\r{}", " ".repeat(80));
        print!("\r");
        std::io::stdout().flush().ok();
    }

    fn create_table(&self) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        } else {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        }
        table
    }

    fn result_table<T: DocumentView>(&self, result: &SearchResult<T>) -> Table {
        let rows: Vec<Vec<Column>> = result.documents.iter().map(flat_row).collect();

        let mut columns: Vec<(String, Tone)> = Vec::new();
        for row in &rows {
            for column in row {
                if !columns.iter().any(|(name, _)| *name == column.name) {
                    columns.push((column.name.clone(), column.tone));
                }
            }
        }

        let mut table = self.create_table();
        let header: Vec<Cell> = columns
            .iter()
            .map(|(name, tone)| {
                let cell = Cell::new(name).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(tone.table_color()) }
            })
            .collect();
        table.set_header(header);

        for row in &rows {
            let cells: Vec<Cell> = columns
                .iter()
                .map(|(name, _)| {
                    row.iter()
                        .find(|column| column.name == *name)
                        .map(|column| Cell::new(&column.value))
                        .unwrap_or_else(|| Cell::new(""))
                })
                .collect();
            table.add_row(cells);
        }
        table
    }
}

struct Column {
    name: String,
    tone: Tone,
    value: String,
}

/// One display row: metadata first, then entries. An entry sharing a metadata name is
/// qualified with the entries key so both stay visible.
fn flat_row<T: DocumentView>(document: &T) -> Vec<Column> {
    let metadata = document.metadata();
    let mut row: Vec<Column> = metadata
        .iter()
        .map(|(name, value)| Column {
            name: name.to_string(),
            tone: Tone::MetadataColumn,
            value: value.clone(),
        })
        .collect();
    row.extend(document.entries().into_iter().map(|(name, value)| {
        let name = if metadata.iter().any(|(meta, _)| *meta == name) {
            format!("{}.{}", T::ENTRIES_KEY, name)
        } else {
            name
        };
        Column {
            name,
            tone: Tone::EntryColumn,
            value,
        }
    }));
    row
}

fn compact_line<T: DocumentView>(document: &T) -> String {
    flat_row(document)
        .iter()
        .map(|column| format!("{}={}", column.name, column.value))
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use ftquery::reply::{Document, SpellcheckTerm};

    fn result() -> SearchResult<Document> {
        let mut doc = Document {
            id: Some("doc:1".to_string()),
            ..Document::default()
        };
        doc.fields.insert("title".to_string(), "Hello".to_string());
        SearchResult {
            total: 1,
            documents: vec![doc],
        }
    }

    #[test]
    fn compact_line_joins_pairs() {
        assert_eq!(compact_line(&result().documents[0]), "id=doc:1 title=Hello");
    }

    #[test]
    fn spellcheck_suggestions_become_columns() {
        let mut term = SpellcheckTerm {
            term: "helo".to_string(),
            ..SpellcheckTerm::default()
        };
        term.suggestions.insert("hello".to_string(), "0.8".to_string());
        assert_eq!(compact_line(&term), "term=helo hello=0.8");
    }

    #[test]
    fn table_has_one_column_per_name() {
        let manager = OutputManager::new(GlobalOptions {
            no_color: true,
            ..Default::default()
        });
        let rendered = manager.result_table(&result()).to_string();
        assert!(rendered.contains("id"));
        assert!(rendered.contains("title"));
        assert!(rendered.contains("Hello"));
    }

    #[test]
    fn entry_sharing_a_metadata_name_is_qualified() {
        let mut result = result();
        result.documents[0]
            .fields
            .insert("id".to_string(), "sku-9".to_string());
        assert_eq!(
            compact_line(&result.documents[0]),
            "id=doc:1 fields.id=sku-9 title=Hello"
        );
    }

    #[test]
    fn quiet_display_is_ok() {
        let manager = OutputManager::new(GlobalOptions {
            quiet: true,
            ..Default::default()
        });
        assert!(manager.display_result(&result(), OutputMode::Object).is_ok());
    }
}
