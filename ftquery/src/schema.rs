//! Index schemas and their `FT.CREATE` argument lists.
//!
//! | Field type | Fragment                                                          |
//! |------------|-------------------------------------------------------------------|
//! | Text       | `name [AS alias] TEXT [NOSTEM] WEIGHT w [SORTABLE] [NOINDEX]`     |
//! | Tag        | `name [AS alias] TAG SEPARATOR s [SORTABLE] [NOINDEX]`            |
//! | Numeric    | `name [AS alias] NUMERIC [SORTABLE] [NOINDEX]`                    |
//! | Geo        | `name [AS alias] GEO [NOINDEX]`                                   |

use log::warn;

use crate::errors::{FtError, FtResult};
use crate::query::format_numeric;

const DEFAULT_WEIGHT: f64 = 1.0;
const DEFAULT_TAG_SEPARATOR: &str = ",";

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text { weight: f64, no_stem: bool },
    Tag { separator: String },
    Numeric,
    Geo,
}

impl FieldKind {
    #[inline]
    pub const fn keyword(&self) -> &'static str {
        match self {
            FieldKind::Text { .. } => "TEXT",
            FieldKind::Tag { .. } => "TAG",
            FieldKind::Numeric => "NUMERIC",
            FieldKind::Geo => "GEO",
        }
    }
}

/// One attribute of an index schema.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDefinition {
    name: String,
    alias: Option<String>,
    kind: FieldKind,
    sortable: bool,
    no_index: bool,
}

impl FieldDefinition {
    fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            alias: None,
            kind,
            sortable: false,
            no_index: false,
        }
    }

    pub fn text(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Text {
                weight: DEFAULT_WEIGHT,
                no_stem: false,
            },
        )
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(
            name,
            FieldKind::Tag {
                separator: DEFAULT_TAG_SEPARATOR.to_string(),
            },
        )
    }

    pub fn numeric(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Numeric)
    }

    pub fn geo(name: impl Into<String>) -> Self {
        Self::new(name, FieldKind::Geo)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn kind(&self) -> &FieldKind {
        &self.kind
    }

    #[inline]
    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Geo fields cannot be sortable; the flag is ignored for them.
    pub fn sortable(mut self) -> Self {
        if matches!(self.kind, FieldKind::Geo) {
            warn!("ignoring SORTABLE on geo field {}", self.name);
        } else {
            self.sortable = true;
        }
        self
    }

    #[inline]
    pub fn no_index(mut self) -> Self {
        self.no_index = true;
        self
    }

    /// Text fields only.
    pub fn weight(mut self, value: f64) -> Self {
        match &mut self.kind {
            FieldKind::Text { weight, .. } => *weight = value,
            _ => warn!("ignoring WEIGHT on non-text field {}", self.name),
        }
        self
    }

    /// Text fields only.
    pub fn no_stem(mut self) -> Self {
        match &mut self.kind {
            FieldKind::Text { no_stem, .. } => *no_stem = true,
            _ => warn!("ignoring NOSTEM on non-text field {}", self.name),
        }
        self
    }

    /// Tag fields only.
    pub fn separator(mut self, value: impl Into<String>) -> Self {
        match &mut self.kind {
            FieldKind::Tag { separator } => *separator = value.into(),
            _ => warn!("ignoring SEPARATOR on non-tag field {}", self.name),
        }
        self
    }

    /// The ordered `FT.CREATE ... SCHEMA` fragment for this field.
    pub fn definition(&self) -> Vec<String> {
        let mut parts = vec![self.name.clone()];
        if let Some(alias) = &self.alias {
            parts.push("AS".to_string());
            parts.push(alias.clone());
        }
        parts.push(self.kind.keyword().to_string());

        match &self.kind {
            FieldKind::Text { weight, no_stem } => {
                if *no_stem {
                    parts.push("NOSTEM".to_string());
                }
                parts.push("WEIGHT".to_string());
                parts.push(format_numeric(*weight));
            }
            FieldKind::Tag { separator } => {
                parts.push("SEPARATOR".to_string());
                parts.push(separator.clone());
            }
            FieldKind::Numeric | FieldKind::Geo => {}
        }

        if self.sortable {
            parts.push("SORTABLE".to_string());
        }
        if self.no_index {
            parts.push("NOINDEX".to_string());
        }
        parts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Storage {
    #[default]
    Hash,
    Json,
}

impl Storage {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Storage::Hash => "HASH",
            Storage::Json => "JSON",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StopWords {
    /// Engine's built-in list.
    #[default]
    Default,
    Custom(Vec<String>),
    /// `STOPWORDS 0`
    Disabled,
}

/// Name, storage options and ordered fields of one search index.
///
/// ```
/// use ftquery::schema::{FieldDefinition, IndexSchema};
///
/// let schema = IndexSchema::new("books")
///     .prefix("book:")
///     .field(FieldDefinition::text("title").weight(2.0).sortable())
///     .field(FieldDefinition::tag("genre"));
///
/// assert_eq!(
///     schema.create_args().unwrap(),
///     [
///         "books", "ON", "HASH", "PREFIX", "1", "book:", "SCHEMA",
///         "title", "TEXT", "WEIGHT", "2", "SORTABLE", "genre", "TAG", "SEPARATOR", ",",
///     ]
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct IndexSchema {
    name: String,
    storage: Storage,
    prefixes: Vec<String>,
    no_offsets: bool,
    no_fields: bool,
    stop_words: StopWords,
    fields: Vec<FieldDefinition>,
}

impl IndexSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            storage: Storage::default(),
            prefixes: Vec::new(),
            no_offsets: false,
            no_fields: false,
            stop_words: StopWords::default(),
            fields: Vec::new(),
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    /// Key prefix prepended to document ids; the first one registered.
    #[inline]
    pub fn key_prefix(&self) -> &str {
        self.prefixes.first().map(String::as_str).unwrap_or_default()
    }

    #[inline]
    pub fn storage(mut self, storage: Storage) -> Self {
        self.storage = storage;
        self
    }

    #[inline]
    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefixes.push(prefix.into());
        self
    }

    #[inline]
    pub fn no_offsets(mut self) -> Self {
        self.no_offsets = true;
        self
    }

    #[inline]
    pub fn no_fields(mut self) -> Self {
        self.no_fields = true;
        self
    }

    #[inline]
    pub fn stop_words(mut self, stop_words: StopWords) -> Self {
        self.stop_words = stop_words;
        self
    }

    #[inline]
    pub fn field(mut self, field: FieldDefinition) -> Self {
        self.fields.push(field);
        self
    }

    /// Arguments of `FT.CREATE`, without the command name.
    pub fn create_args(&self) -> FtResult<Vec<String>> {
        if self.fields.is_empty() {
            return Err(FtError::invalid_argument(format!(
                "Index {} has no fields in its schema",
                self.name
            )));
        }

        let mut args = vec![self.name.clone(), "ON".to_string(), self.storage.as_str().to_string()];
        if !self.prefixes.is_empty() {
            args.push("PREFIX".to_string());
            args.push(self.prefixes.len().to_string());
            args.extend(self.prefixes.iter().cloned());
        }
        if self.no_offsets {
            args.push("NOOFFSETS".to_string());
        }
        if self.no_fields {
            args.push("NOFIELDS".to_string());
        }
        match &self.stop_words {
            StopWords::Default => {}
            StopWords::Custom(words) => {
                args.push("STOPWORDS".to_string());
                args.push(words.len().to_string());
                args.extend(words.iter().cloned());
            }
            StopWords::Disabled => {
                args.push("STOPWORDS".to_string());
                args.push("0".to_string());
            }
        }

        args.push("SCHEMA".to_string());
        for field in &self.fields {
            args.extend(field.definition());
        }
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_fragment_orders_modifiers() {
        let field = FieldDefinition::text("title")
            .alias("t")
            .no_index()
            .sortable()
            .no_stem()
            .weight(0.5);
        assert_eq!(
            field.definition(),
            ["title", "AS", "t", "TEXT", "NOSTEM", "WEIGHT", "0.5", "SORTABLE", "NOINDEX"]
        );
    }

    #[test]
    fn tag_uses_comma_separator_by_default() {
        assert_eq!(FieldDefinition::tag("genre").definition(), ["genre", "TAG", "SEPARATOR", ","]);
        assert_eq!(
            FieldDefinition::tag("genre").separator(";").definition(),
            ["genre", "TAG", "SEPARATOR", ";"]
        );
    }

    #[test]
    fn geo_ignores_sortable_and_weight() {
        let field = FieldDefinition::geo("location").sortable().weight(3.0).no_index();
        assert_eq!(field.definition(), ["location", "GEO", "NOINDEX"]);
    }

    #[test]
    fn numeric_fragment() {
        assert_eq!(
            FieldDefinition::numeric("price").sortable().definition(),
            ["price", "NUMERIC", "SORTABLE"]
        );
    }

    #[test]
    fn create_args_include_storage_options() {
        let schema = IndexSchema::new("idx")
            .storage(Storage::Json)
            .prefix("a:")
            .prefix("b:")
            .no_offsets()
            .no_fields()
            .stop_words(StopWords::Custom(vec!["the".to_string(), "a".to_string()]))
            .field(FieldDefinition::numeric("$.price").alias("price"));
        assert_eq!(
            schema.create_args().unwrap(),
            [
                "idx", "ON", "JSON", "PREFIX", "2", "a:", "b:", "NOOFFSETS", "NOFIELDS", "STOPWORDS", "2", "the", "a",
                "SCHEMA", "$.price", "AS", "price", "NUMERIC",
            ]
        );
        assert_eq!(schema.key_prefix(), "a:");
    }

    #[test]
    fn disabled_stop_words_send_zero() {
        let args = IndexSchema::new("idx")
            .stop_words(StopWords::Disabled)
            .field(FieldDefinition::text("body"))
            .create_args()
            .unwrap();
        assert_eq!(args, ["idx", "ON", "HASH", "STOPWORDS", "0", "SCHEMA", "body", "TEXT", "WEIGHT", "1"]);
    }

    #[test]
    fn empty_schema_is_rejected() {
        let err = IndexSchema::new("idx").create_args().unwrap_err();
        assert!(matches!(err, FtError::InvalidArgument { .. }));
    }
}
