use colored::{Color, Colorize};
use comfy_table::Color as TableColor;

/// What a piece of terminal text is, which decides how it is painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tone {
    Success,
    Failure,
    Warning,
    Info,
    Progress,
    /// A recorded `FT.*` command line.
    Command,
    Heading,
    Title,
    Example,
    EnvKey,
    EnvDescription,
    Placeholder,
    /// Table column holding engine metadata (id, score, term).
    MetadataColumn,
    /// Table column holding a stored field or suggestion.
    EntryColumn,
}

impl Tone {
    pub const fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Failure => Color::Red,
            Tone::Warning => Color::Yellow,
            Tone::Info => Color::Blue,
            Tone::Progress | Tone::Heading => Color::Cyan,
            Tone::Command | Tone::EnvDescription => Color::White,
            Tone::Title => Color::BrightBlue,
            Tone::Example => Color::Magenta,
            Tone::EnvKey => Color::BrightCyan,
            Tone::Placeholder => Color::BrightBlack,
            Tone::MetadataColumn => Color::Yellow,
            Tone::EntryColumn => Color::Cyan,
        }
    }

    pub const fn table_color(self) -> TableColor {
        match self {
            Tone::MetadataColumn => TableColor::Yellow,
            _ => TableColor::Cyan,
        }
    }

    /// Leading marker for status lines.
    pub const fn marker(self) -> Option<&'static str> {
        match self {
            Tone::Success => Some("✓"),
            Tone::Failure => Some("✗"),
            Tone::Warning => Some("⚠"),
            Tone::Info => Some("ℹ"),
            Tone::Progress => Some("⟳"),
            Tone::Command | Tone::Example => Some("→"),
            _ => None,
        }
    }

    const fn bold(self) -> bool {
        matches!(self, Tone::Heading | Tone::Title | Tone::EnvKey | Tone::Progress)
    }
}

pub fn paint(text: &str, tone: Tone, use_color: bool) -> String {
    if !use_color {
        return text.to_string();
    }
    let styled = text.color(tone.color());
    if tone.bold() { styled.bold().to_string() } else { styled.to_string() }
}

/// `text` prefixed by the tone's marker, when it has one.
pub fn line(text: &str, tone: Tone, use_color: bool) -> String {
    match tone.marker() {
        Some(marker) => format!("{} {}", paint(marker, tone, use_color), paint(text, tone, use_color)),
        None => paint(text, tone, use_color),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncolored_lines_keep_their_marker() {
        assert_eq!(line("stored", Tone::Success, false), "✓ stored");
        assert_eq!(line("FT.SEARCH idx *", Tone::Command, false), "→ FT.SEARCH idx *");
        assert_eq!(line("Examples:", Tone::Heading, false), "Examples:");
    }

    #[test]
    fn metadata_and_entry_columns_differ() {
        assert_ne!(Tone::MetadataColumn.table_color(), Tone::EntryColumn.table_color());
    }
}
