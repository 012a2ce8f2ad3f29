//! Decoding of raw `FT.SEARCH`, `FT.AGGREGATE` and `FT.SPELLCHECK` replies.
//!
//! Search replies are flat: `[total, row1.., row2.., ...]` where every row spans the same
//! number of elements (the document *width*). Width depends on what the request asked
//! for, so the caller passes a [`ReplyLayout`] describing it:
//!
//! ```text
//! WITHSCORES, with content:  [1, "doc:1", "0.9", ["title", "Hello"]]   width 3
//! WITHSCORES, NOCONTENT:     [1, "doc:1", "0.9"]                        width 2
//! FT.AGGREGATE:              [1, ["brand", "acme", "total", "3"]]       width 1
//! ```
//!
//! A body whose length is not a multiple of the width is rejected rather than
//! truncated.

use std::collections::BTreeMap;

use log::debug;
use redis::{Value, from_redis_value};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

#[cfg(feature = "utoipa")]
use utoipa::ToSchema;

use crate::errors::{FtError, FtResult};

/// Spellcheck suggestions this short are discarded.
const MIN_SUGGESTION_CHARS: usize = 3;

const TERM_MARKER: &str = "TERM";

/// Which optional sections each document row of a reply contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyLayout {
    pub with_ids: bool,
    pub with_scores: bool,
    pub with_payloads: bool,
    pub with_sort_keys: bool,
    pub no_content: bool,
}

impl Default for ReplyLayout {
    fn default() -> Self {
        Self {
            with_ids: true,
            with_scores: false,
            with_payloads: false,
            with_sort_keys: false,
            no_content: false,
        }
    }
}

impl ReplyLayout {
    /// Layout of `FT.AGGREGATE` rows: one property array, nothing else.
    #[inline]
    pub fn aggregate() -> Self {
        Self {
            with_ids: false,
            ..Self::default()
        }
    }

    /// Number of flat reply elements per document.
    pub fn width(&self) -> usize {
        [
            self.with_ids,
            self.with_scores,
            self.with_payloads,
            self.with_sort_keys,
            !self.no_content,
        ]
        .into_iter()
        .filter(|present| *present)
        .count()
    }
}

/// Selects the JSON shape of decoded documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    /// `[["id", "doc:1"], ["fields", [["title", "Hello"]]]]`
    Pairs,
    /// `{"id": "doc:1", "fields": {"title": "Hello"}}`
    #[default]
    Object,
}

fn render(pairs: Vec<(String, JsonValue)>, mode: OutputMode) -> JsonValue {
    match mode {
        OutputMode::Pairs => JsonValue::Array(
            pairs
                .into_iter()
                .map(|(name, value)| JsonValue::Array(vec![JsonValue::String(name), value]))
                .collect(),
        ),
        OutputMode::Object => JsonValue::Object(pairs.into_iter().collect::<Map<String, JsonValue>>()),
    }
}

/// Decoded rows: engine-assigned metadata plus the row's own entries.
///
/// Entries are nested under [`DocumentView::ENTRIES_KEY`] so a stored field can never
/// shadow a metadata attribute of the same name.
pub trait DocumentView {
    const ENTRIES_KEY: &'static str;

    fn metadata(&self) -> Vec<(&'static str, String)>;

    fn entries(&self) -> Vec<(String, String)>;

    fn to_json(&self, mode: OutputMode) -> JsonValue {
        let entries = self
            .entries()
            .into_iter()
            .map(|(name, value)| (name, JsonValue::String(value)))
            .collect();
        let pairs = self
            .metadata()
            .into_iter()
            .map(|(name, value)| (name.to_string(), JsonValue::String(value)))
            .chain(std::iter::once((Self::ENTRIES_KEY.to_string(), render(entries, mode))))
            .collect();
        render(pairs, mode)
    }
}

/// One search or aggregate result row.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_key: Option<String>,
    pub fields: BTreeMap<String, String>,
}

impl Document {
    #[inline]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

impl DocumentView for Document {
    const ENTRIES_KEY: &'static str = "fields";

    fn metadata(&self) -> Vec<(&'static str, String)> {
        [
            ("id", &self.id),
            ("score", &self.score),
            ("payload", &self.payload),
            ("sort_key", &self.sort_key),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.clone().map(|v| (name, v)))
        .collect()
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.fields.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Suggestions for one misspelled query term.
#[cfg_attr(feature = "utoipa", derive(ToSchema))]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpellcheckTerm {
    pub term: String,
    /// Suggested word to score.
    pub suggestions: BTreeMap<String, String>,
}

impl DocumentView for SpellcheckTerm {
    const ENTRIES_KEY: &'static str = "suggestions";

    fn metadata(&self) -> Vec<(&'static str, String)> {
        vec![("term", self.term.clone())]
    }

    fn entries(&self) -> Vec<(String, String)> {
        self.suggestions.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

/// Decoded reply: the engine's total match count plus the rows actually returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult<T> {
    pub total: u64,
    pub documents: Vec<T>,
}

impl<T> SearchResult<T> {
    #[inline]
    pub fn empty() -> Self {
        Self {
            total: 0,
            documents: Vec::new(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.documents.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

impl<T: DocumentView> SearchResult<T> {
    pub fn to_json(&self, mode: OutputMode) -> JsonValue {
        serde_json::json!({
            "total": self.total,
            "documents": self.documents.iter().map(|doc| doc.to_json(mode)).collect::<Vec<_>>(),
        })
    }
}

/// Decode a search or aggregate reply.
///
/// ```
/// use ftquery::reply::{ReplyLayout, decode_search};
/// use redis::Value;
///
/// let bulk = |s: &str| Value::BulkString(s.as_bytes().to_vec());
/// let raw = Value::Array(vec![
///     Value::Int(1),
///     bulk("doc:1"),
///     bulk("0.9"),
///     Value::Array(vec![bulk("title"), bulk("Hello")]),
/// ]);
/// let layout = ReplyLayout { with_scores: true, ..ReplyLayout::default() };
///
/// let result = decode_search(&raw, layout).unwrap();
/// assert_eq!(result.total, 1);
/// assert_eq!(result.documents[0].id.as_deref(), Some("doc:1"));
/// assert_eq!(result.documents[0].field("title"), Some("Hello"));
/// ```
pub fn decode_search(raw: &Value, layout: ReplyLayout) -> FtResult<SearchResult<Document>> {
    let items = match raw {
        Value::Nil => return Ok(SearchResult::empty()),
        Value::Array(items) => items,
        other => {
            return Err(FtError::malformed_reply(format!(
                "expected an array search reply, got {:?}",
                other
            )));
        }
    };

    let Some((count, body)) = items.split_first() else {
        return Ok(SearchResult::empty());
    };
    let total = parse_total(count)?;

    if body.is_empty() {
        return Ok(SearchResult {
            total,
            documents: Vec::new(),
        });
    }

    let width = layout.width();
    if width == 0 {
        return Err(FtError::malformed_reply(
            "reply has a body but the requested layout has no document sections",
        ));
    }
    if body.len() % width != 0 {
        return Err(FtError::malformed_reply(format!(
            "{} reply elements do not divide into documents of width {}",
            body.len(),
            width
        )));
    }

    let documents = body
        .chunks(width)
        .map(|row| decode_row(row, layout))
        .collect::<FtResult<Vec<_>>>()?;

    debug!("decoded {} documents of width {} (total {})", documents.len(), width, total);
    Ok(SearchResult { total, documents })
}

/// Decode an `FT.SPELLCHECK` reply: `[["TERM", term, [[score, suggestion], ..]], ..]`.
pub fn decode_spellcheck(raw: &Value) -> FtResult<SearchResult<SpellcheckTerm>> {
    let rows = match raw {
        Value::Nil => return Ok(SearchResult::empty()),
        Value::Array(rows) => rows,
        other => {
            return Err(FtError::malformed_reply(format!(
                "expected an array spellcheck reply, got {:?}",
                other
            )));
        }
    };

    let documents = rows.iter().map(decode_spellcheck_row).collect::<FtResult<Vec<_>>>()?;
    Ok(SearchResult {
        total: documents.len() as u64,
        documents,
    })
}

fn decode_row(row: &[Value], layout: ReplyLayout) -> FtResult<Document> {
    let mut cells = row.iter();
    let mut document = Document::default();

    if layout.with_ids {
        document.id = cells.next().map(value_to_string).transpose()?;
    }
    if layout.with_scores {
        document.score = cells.next().map(optional_string).transpose()?.flatten();
    }
    if layout.with_payloads {
        document.payload = cells.next().map(optional_string).transpose()?.flatten();
    }
    if layout.with_sort_keys {
        document.sort_key = cells.next().map(optional_string).transpose()?.flatten();
    }
    if let Some(fields) = cells.next() {
        document.fields = decode_fields(fields)?;
    }

    Ok(document)
}

fn decode_fields(value: &Value) -> FtResult<BTreeMap<String, String>> {
    let mut fields = BTreeMap::new();
    match value {
        Value::Nil => {}
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(FtError::malformed_reply(format!(
                    "document field array has odd length {}",
                    items.len()
                )));
            }
            for pair in items.chunks(2) {
                let name = value_to_string(&pair[0])?;
                if let Some(value) = optional_string(&pair[1])? {
                    fields.insert(name, value);
                }
            }
        }
        Value::Map(pairs) => {
            for (name, value) in pairs {
                if let Some(value) = optional_string(value)? {
                    fields.insert(value_to_string(name)?, value);
                }
            }
        }
        other => {
            return Err(FtError::malformed_reply(format!(
                "expected a document field array, got {:?}",
                other
            )));
        }
    }
    Ok(fields)
}

fn decode_spellcheck_row(row: &Value) -> FtResult<SpellcheckTerm> {
    let Value::Array(cells) = row else {
        return Err(FtError::malformed_reply("spellcheck row is not an array"));
    };
    let [marker, term, suggestions] = cells.as_slice() else {
        return Err(FtError::malformed_reply(format!(
            "spellcheck row has {} elements, expected 3",
            cells.len()
        )));
    };
    if value_to_string(marker)? != TERM_MARKER {
        return Err(FtError::malformed_reply("spellcheck row is missing the TERM marker"));
    }

    let mut entry = SpellcheckTerm {
        term: value_to_string(term)?,
        suggestions: BTreeMap::new(),
    };

    let suggestions = match suggestions {
        Value::Nil => return Ok(entry),
        Value::Array(suggestions) => suggestions,
        _ => return Err(FtError::malformed_reply("spellcheck suggestions are not an array")),
    };

    for suggestion in suggestions {
        let Value::Array(pair) = suggestion else {
            return Err(FtError::malformed_reply("spellcheck suggestion is not an array"));
        };
        let [score, word] = pair.as_slice() else {
            return Err(FtError::malformed_reply("spellcheck suggestion must be [score, word]"));
        };
        let word = value_to_string(word)?;
        if word.chars().count() >= MIN_SUGGESTION_CHARS {
            entry.suggestions.insert(word, value_to_string(score)?);
        }
    }

    Ok(entry)
}

fn parse_total(value: &Value) -> FtResult<u64> {
    match value {
        Value::Int(v) => u64::try_from(*v)
            .map_err(|_| FtError::malformed_reply(format!("Negative total count in search reply: {}", v))),
        Value::BulkString(_) | Value::SimpleString(_) => value_to_string(value)?
            .trim()
            .parse::<u64>()
            .map_err(|_| FtError::malformed_reply("Invalid total count in search reply")),
        other => Err(FtError::malformed_reply(format!("Unexpected total count type: {:?}", other))),
    }
}

fn optional_string(value: &Value) -> FtResult<Option<String>> {
    match value {
        Value::Nil => Ok(None),
        other => value_to_string(other).map(Some),
    }
}

/// Convert a scalar reply value to a string.
pub fn value_to_string(value: &Value) -> FtResult<String> {
    match value {
        Value::BulkString(bytes) => String::from_utf8(bytes.clone())
            .map_err(|err| FtError::malformed_reply(format!("Invalid UTF-8 in reply: {}", err))),
        Value::SimpleString(status) => Ok(status.clone()),
        Value::Okay => Ok("OK".to_string()),
        Value::Int(v) => Ok(v.to_string()),
        Value::Double(v) => Ok(v.to_string()),
        Value::Boolean(v) => Ok(v.to_string()),
        Value::VerbatimString { text, .. } => Ok(text.clone()),
        _ => from_redis_value::<String>(value)
            .map_err(|err| FtError::malformed_reply(format!("Unexpected reply value type: {}", err))),
    }
}

/// Convert any reply value to JSON, turning flat `[name, value, ..]` arrays into objects
/// when every even element is a string name.
pub fn value_to_json(value: &Value) -> JsonValue {
    match value {
        Value::Nil => JsonValue::Null,
        Value::Int(v) => JsonValue::from(*v),
        Value::Double(v) => JsonValue::from(*v),
        Value::Boolean(v) => JsonValue::Bool(*v),
        Value::Array(items) | Value::Set(items) => {
            if let Some(object) = pairs_to_object(items) {
                object
            } else {
                JsonValue::Array(items.iter().map(value_to_json).collect())
            }
        }
        Value::Map(pairs) => JsonValue::Object(
            pairs
                .iter()
                .map(|(k, v)| (value_to_string(k).unwrap_or_default(), value_to_json(v)))
                .collect(),
        ),
        other => value_to_string(other)
            .map(JsonValue::String)
            .unwrap_or(JsonValue::Null),
    }
}

fn pairs_to_object(items: &[Value]) -> Option<JsonValue> {
    if items.is_empty() || items.len() % 2 != 0 {
        return None;
    }
    let mut object = Map::new();
    for pair in items.chunks(2) {
        match &pair[0] {
            Value::BulkString(_) | Value::SimpleString(_) => {
                object.insert(value_to_string(&pair[0]).ok()?, value_to_json(&pair[1]));
            }
            _ => return None,
        }
    }
    Some(JsonValue::Object(object))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bulk(s: &str) -> Value {
        Value::BulkString(s.as_bytes().to_vec())
    }

    fn array(items: Vec<Value>) -> Value {
        Value::Array(items)
    }

    #[test]
    fn width_counts_requested_sections() {
        assert_eq!(ReplyLayout::default().width(), 2);
        assert_eq!(ReplyLayout::aggregate().width(), 1);
        let everything = ReplyLayout {
            with_ids: true,
            with_scores: true,
            with_payloads: true,
            with_sort_keys: true,
            no_content: false,
        };
        assert_eq!(everything.width(), 5);
        let ids_only = ReplyLayout {
            no_content: true,
            ..ReplyLayout::default()
        };
        assert_eq!(ids_only.width(), 1);
    }

    #[test]
    fn nil_and_empty_replies_decode_to_empty_result() {
        assert_eq!(decode_search(&Value::Nil, ReplyLayout::default()).unwrap(), SearchResult::empty());
        assert_eq!(decode_search(&array(vec![]), ReplyLayout::default()).unwrap(), SearchResult::empty());
    }

    #[test]
    fn count_without_body_keeps_total() {
        let result = decode_search(&array(vec![Value::Int(42)]), ReplyLayout::default()).unwrap();
        assert_eq!(result.total, 42);
        assert!(result.is_empty());
    }

    #[test]
    fn string_total_is_accepted() {
        let raw = array(vec![bulk("2"), bulk("a"), array(vec![]), bulk("b"), array(vec![])]);
        let result = decode_search(&raw, ReplyLayout::default()).unwrap();
        assert_eq!(result.total, 2);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn remainder_is_malformed() {
        let raw = array(vec![
            Value::Int(2),
            bulk("doc:1"),
            array(vec![bulk("title"), bulk("Hello")]),
            bulk("doc:2"),
        ]);
        let err = decode_search(&raw, ReplyLayout::default()).unwrap_err();
        assert!(matches!(err, FtError::MalformedReply { message } if message.contains("width 2")));
    }

    #[test]
    fn payload_and_sort_key_are_shifted_in_order() {
        let layout = ReplyLayout {
            with_scores: true,
            with_payloads: true,
            with_sort_keys: true,
            ..ReplyLayout::default()
        };
        let raw = array(vec![
            Value::Int(1),
            bulk("doc:1"),
            bulk("1.5"),
            Value::Nil,
            bulk("$hello"),
            array(vec![bulk("title"), bulk("Hello")]),
        ]);
        let doc = &decode_search(&raw, layout).unwrap().documents[0];
        assert_eq!(doc.score.as_deref(), Some("1.5"));
        assert_eq!(doc.payload, None);
        assert_eq!(doc.sort_key.as_deref(), Some("$hello"));
        assert_eq!(doc.field("title"), Some("Hello"));
    }

    #[test]
    fn odd_field_array_is_malformed() {
        let raw = array(vec![Value::Int(1), bulk("doc:1"), array(vec![bulk("title")])]);
        assert!(matches!(
            decode_search(&raw, ReplyLayout::default()),
            Err(FtError::MalformedReply { .. })
        ));
    }

    #[test]
    fn non_array_reply_is_malformed() {
        assert!(matches!(
            decode_search(&bulk("oops"), ReplyLayout::default()),
            Err(FtError::MalformedReply { .. })
        ));
    }

    #[test]
    fn negative_total_is_malformed() {
        assert!(matches!(
            decode_search(&array(vec![Value::Int(-1)]), ReplyLayout::default()),
            Err(FtError::MalformedReply { .. })
        ));
    }

    #[test]
    fn spellcheck_row_without_marker_is_malformed() {
        let raw = array(vec![array(vec![bulk("WORD"), bulk("helo"), array(vec![])])]);
        assert!(matches!(decode_spellcheck(&raw), Err(FtError::MalformedReply { .. })));

        let short = array(vec![array(vec![bulk("TERM"), bulk("helo")])]);
        assert!(matches!(decode_spellcheck(&short), Err(FtError::MalformedReply { .. })));
    }

    #[test]
    fn output_modes_carry_identical_data() {
        let mut doc = Document {
            id: Some("doc:1".to_string()),
            ..Document::default()
        };
        doc.fields.insert("title".to_string(), "Hello".to_string());

        assert_eq!(
            doc.to_json(OutputMode::Object),
            serde_json::json!({"id": "doc:1", "fields": {"title": "Hello"}})
        );
        assert_eq!(
            doc.to_json(OutputMode::Pairs),
            serde_json::json!([["id", "doc:1"], ["fields", [["title", "Hello"]]]])
        );
    }

    #[test]
    fn stored_field_named_id_does_not_shadow_document_id() {
        let mut doc = Document {
            id: Some("doc:1".to_string()),
            score: Some("0.5".to_string()),
            ..Document::default()
        };
        doc.fields.insert("id".to_string(), "sku-9".to_string());
        doc.fields.insert("score".to_string(), "high".to_string());

        assert_eq!(
            doc.to_json(OutputMode::Object),
            serde_json::json!({"id": "doc:1", "score": "0.5", "fields": {"id": "sku-9", "score": "high"}})
        );
        assert_eq!(
            doc.to_json(OutputMode::Pairs),
            serde_json::json!([
                ["id", "doc:1"],
                ["score", "0.5"],
                ["fields", [["id", "sku-9"], ["score", "high"]]]
            ])
        );
    }

    #[test]
    fn spellcheck_terms_nest_suggestions() {
        let mut term = SpellcheckTerm {
            term: "helo".to_string(),
            ..SpellcheckTerm::default()
        };
        term.suggestions.insert("hello".to_string(), "0.8".to_string());
        assert_eq!(
            term.to_json(OutputMode::Object),
            serde_json::json!({"term": "helo", "suggestions": {"hello": "0.8"}})
        );
        assert_eq!(
            term.to_json(OutputMode::Pairs),
            serde_json::json!([["term", "helo"], ["suggestions", [["hello", "0.8"]]]])
        );
    }

    #[test]
    fn value_to_json_turns_flat_pairs_into_objects() {
        let raw = array(vec![
            bulk("index_name"),
            bulk("idx"),
            bulk("num_docs"),
            Value::Int(3),
            bulk("attributes"),
            array(vec![array(vec![bulk("identifier"), bulk("title")])]),
        ]);
        assert_eq!(
            value_to_json(&raw),
            serde_json::json!({
                "index_name": "idx",
                "num_docs": 3,
                "attributes": [{"identifier": "title"}],
            })
        );
    }
}
