use ftquery::document::IndexDocument;
use ftquery::errors::FtError;
use ftquery::index::Index;
use ftquery::schema::{FieldDefinition, IndexSchema, StopWords};
use ftquery::transport::RecordingTransport;
use redis::Value;
use serde_json::json;

fn bulk(s: &str) -> Value {
    Value::BulkString(s.as_bytes().to_vec())
}

fn books_schema() -> IndexSchema {
    IndexSchema::new("books")
        .prefix("book:")
        .stop_words(StopWords::Disabled)
        .field(FieldDefinition::text("title").weight(5.0).sortable())
        .field(FieldDefinition::tag("genre").separator("|"))
        .field(FieldDefinition::numeric("year").sortable())
        .field(FieldDefinition::geo("shop"))
}

#[tokio::test]
async fn create_sends_schema_in_insertion_order() {
    let mut index = Index::new(books_schema(), RecordingTransport::new());
    index.create().await.unwrap();

    let sent = index.transport_mut().last().cloned().unwrap();
    assert_eq!(sent.name, "FT.CREATE");
    assert_eq!(
        sent.args,
        [
            "books", "ON", "HASH", "PREFIX", "1", "book:", "STOPWORDS", "0", "SCHEMA", "title", "TEXT", "WEIGHT", "5",
            "SORTABLE", "genre", "TAG", "SEPARATOR", "|", "year", "NUMERIC", "SORTABLE", "shop", "GEO",
        ]
    );
}

#[tokio::test]
async fn create_without_fields_sends_nothing() {
    let mut index = Index::new(IndexSchema::new("empty"), RecordingTransport::new());
    let err = index.create().await.unwrap_err();
    assert!(matches!(err, FtError::InvalidArgument { .. }));
    assert!(index.transport_mut().sent().is_empty());
}

#[tokio::test]
async fn info_is_decoded_to_json() {
    let transport = RecordingTransport::new().with_reply(Value::Array(vec![
        bulk("index_name"),
        bulk("books"),
        bulk("num_docs"),
        Value::Int(12),
    ]));
    let mut index = Index::new(books_schema(), transport);

    let info = index.info().await.unwrap();
    assert_eq!(info, json!({"index_name": "books", "num_docs": 12}));
    assert_eq!(index.transport_mut().last().unwrap().args, ["books"]);
}

#[tokio::test]
async fn documents_round_through_hset_and_search() {
    let mut index = Index::new(books_schema(), RecordingTransport::new());
    let doc = IndexDocument::with_id("42")
        .field("title", "Dune")
        .field("year", "1965")
        .with_score(3.0);
    index.add(&doc).await.unwrap();

    let sent = index.transport_mut().last().cloned().unwrap();
    assert_eq!(sent.name, "HSET");
    assert_eq!(sent.args, ["book:42", "title", "Dune", "year", "1965", "__score", "1"]);

    index.transport_mut().push_reply(Value::Array(vec![
        Value::Int(1),
        bulk("book:42"),
        Value::Array(vec![bulk("title"), bulk("Dune")]),
    ]));
    let command = index.search_command().limit(0, 1);
    let result = command.search(index.transport_mut(), "dune").await.unwrap();
    assert_eq!(result.documents[0].id.as_deref(), Some("book:42"));
}
