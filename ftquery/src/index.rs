//! Index maintenance bound to one schema and one transport.

use log::{debug, info};
use redis::Value;
use serde_json::Value as JsonValue;

use crate::command::{AggregateCommand, SearchCommand, SpellcheckCommand};
use crate::document::IndexDocument;
use crate::errors::{FtError, FtResult};
use crate::reply::value_to_json;
use crate::schema::IndexSchema;
use crate::transport::Transport;

pub const FT_CREATE: &str = "FT.CREATE";
pub const FT_DROPINDEX: &str = "FT.DROPINDEX";
pub const FT_INFO: &str = "FT.INFO";
pub const FT_SYNUPDATE: &str = "FT.SYNUPDATE";

pub struct Index<T> {
    schema: IndexSchema,
    transport: T,
}

impl<T> Index<T>
where
    T: Transport,
{
    pub fn new(schema: IndexSchema, transport: T) -> Self {
        Self { schema, transport }
    }

    #[inline]
    pub fn name(&self) -> &str {
        self.schema.name()
    }

    #[inline]
    pub fn schema(&self) -> &IndexSchema {
        &self.schema
    }

    #[inline]
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    pub async fn create(&mut self) -> FtResult<()> {
        let args = self.schema.create_args()?;
        self.transport.send(FT_CREATE, &args).await?;
        info!("created index {}", self.name());
        Ok(())
    }

    /// `FT.DROPINDEX`, also deleting the indexed keys when `delete_documents` is set.
    pub async fn drop_index(&mut self, delete_documents: bool) -> FtResult<()> {
        let mut args = vec![self.name().to_string()];
        if delete_documents {
            args.push("DD".to_string());
        }
        self.transport.send(FT_DROPINDEX, &args).await?;
        info!("dropped index {}", self.name());
        Ok(())
    }

    /// `FT.INFO` as a JSON object.
    pub async fn info(&mut self) -> FtResult<JsonValue> {
        let args = [self.name().to_string()];
        let raw = self.transport.send(FT_INFO, &args).await?;
        match raw {
            Value::Nil => Err(FtError::malformed_reply(format!("FT.INFO returned nothing for {}", self.name()))),
            other => Ok(value_to_json(&other)),
        }
    }

    /// Store a document with `HSET` under the schema's first key prefix.
    pub async fn add(&mut self, document: &IndexDocument) -> FtResult<()> {
        let args = document.hset_args(self.schema.key_prefix());
        if args.len() < 3 {
            return Err(FtError::invalid_argument(format!("Document {} has no fields", document.id())));
        }
        self.transport.send("HSET", &args).await?;
        debug!("stored document {} in {}", document.id(), self.name());
        Ok(())
    }

    /// Delete a document's key. Returns whether it existed.
    pub async fn delete(&mut self, id: &str) -> FtResult<bool> {
        let args = [format!("{}{}", self.schema.key_prefix(), id)];
        let raw = self.transport.send("DEL", &args).await?;
        Ok(matches!(raw, Value::Int(n) if n > 0))
    }

    /// Ask the server to persist its dataset with a blocking `SAVE`.
    pub async fn save(&mut self) -> FtResult<()> {
        match self.transport.send("SAVE", &[]).await? {
            Value::Okay | Value::Nil => {}
            Value::SimpleString(status) if status == "OK" => {}
            other => return Err(FtError::malformed_reply(format!("SAVE returned {:?}", other))),
        }
        info!("saved dataset holding index {}", self.name());
        Ok(())
    }

    /// Replace the terms of one synonym group.
    pub async fn update_synonyms<I, S>(&mut self, group: &str, terms: I) -> FtResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut args = vec![self.name().to_string(), group.to_string()];
        args.extend(terms.into_iter().map(Into::into));
        if args.len() == 2 {
            return Err(FtError::invalid_argument(format!("Synonym group {} has no terms", group)));
        }
        self.transport.send(FT_SYNUPDATE, &args).await?;
        Ok(())
    }

    #[inline]
    pub fn search_command(&self) -> SearchCommand {
        SearchCommand::new(self.name())
    }

    #[inline]
    pub fn aggregate_command(&self) -> AggregateCommand {
        AggregateCommand::new(self.name())
    }

    #[inline]
    pub fn spellcheck_command(&self) -> SpellcheckCommand {
        SpellcheckCommand::new(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldDefinition;
    use crate::transport::RecordingTransport;

    fn books() -> Index<RecordingTransport> {
        let schema = IndexSchema::new("books")
            .prefix("book:")
            .field(FieldDefinition::text("title"));
        Index::new(schema, RecordingTransport::new())
    }

    #[tokio::test]
    async fn drop_with_documents_sends_dd() {
        let mut index = books();
        index.drop_index(true).await.unwrap();
        let sent = index.transport_mut().last().cloned().unwrap();
        assert_eq!(sent.name, FT_DROPINDEX);
        assert_eq!(sent.args, ["books", "DD"]);
    }

    #[tokio::test]
    async fn add_and_delete_use_prefixed_keys() {
        let mut index = books();
        index.transport_mut().push_reply(Value::Int(1)).push_reply(Value::Int(1));

        let doc = IndexDocument::with_id("7").field("title", "Dune");
        index.add(&doc).await.unwrap();
        assert!(index.delete("7").await.unwrap());

        let sent = index.into_transport().take_sent();
        assert_eq!(sent[0].args, ["book:7", "title", "Dune"]);
        assert_eq!(sent[1].name, "DEL");
        assert_eq!(sent[1].args, ["book:7"]);
    }

    #[tokio::test]
    async fn empty_document_is_rejected_before_sending() {
        let mut index = books();
        let err = index.add(&IndexDocument::with_id("x")).await.unwrap_err();
        assert!(matches!(err, FtError::InvalidArgument { .. }));
        assert!(index.transport_mut().sent().is_empty());
    }

    #[tokio::test]
    async fn synonyms_are_sent_in_order() {
        let mut index = books();
        index.update_synonyms("cars", ["car", "automobile"]).await.unwrap();
        let sent = index.transport_mut().last().cloned().unwrap();
        assert_eq!(sent.args, ["books", "cars", "car", "automobile"]);
    }

    #[tokio::test]
    async fn save_sends_bare_save() {
        let mut index = books();
        index.transport_mut().push_reply(Value::Okay);
        index.save().await.unwrap();
        let sent = index.transport_mut().last().cloned().unwrap();
        assert_eq!(sent.name, "SAVE");
        assert!(sent.args.is_empty());
    }

    #[tokio::test]
    async fn unexpected_save_reply_is_malformed() {
        let mut index = books();
        index.transport_mut().push_reply(Value::Int(3));
        assert!(matches!(index.save().await, Err(FtError::MalformedReply { .. })));
    }

    #[test]
    fn builders_are_bound_to_the_index_name() {
        let index = books();
        assert_eq!(index.search_command().index(), "books");
        assert_eq!(index.aggregate_command().index(), "books");
    }
}
