//! Client-side RediSearch query layer.
//!
//! - [`query`] builds query strings from a tree of conditions.
//! - [`command`] freezes a query and options into `FT.SEARCH`, `FT.AGGREGATE` and
//!   `FT.SPELLCHECK` argument lists.
//! - [`reply`] decodes raw replies into [`SearchResult`]s.
//! - [`schema`], [`document`] and [`index`] cover index creation and document writes.
//!
//! Everything that talks to Redis goes through a [`Transport`].
//!
//! ```no_run
//! use ftquery::command::SearchCommand;
//! use ftquery::query::{ConditionTree, Conjunction};
//! use ftquery::transport::RedisTransport;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = redis::Client::open("redis://127.0.0.1/")?;
//! let mut conn = client.get_multiplexed_async_connection().await?;
//! let mut transport = RedisTransport::new(&mut conn);
//!
//! let mut tree = ConditionTree::default();
//! tree.add_condition("title", ["dune"], Conjunction::And, false);
//!
//! let result = SearchCommand::new("books")
//!     .limit(0, 10)
//!     .with_scores()
//!     .search(&mut transport, &tree)
//!     .await?;
//! println!("{} matches", result.total);
//! # Ok(())
//! # }
//! ```

pub mod command;
pub mod config;
pub mod document;
pub mod errors;
pub mod index;
pub mod query;
pub mod reply;
pub mod schema;
pub mod transport;

pub use command::{AggregateCommand, Query, SearchCommand, SortOrder, SpellcheckCommand};
pub use config::FtConfig;
pub use document::IndexDocument;
pub use errors::{FtError, FtResult};
pub use index::Index;
pub use query::{ConditionTree, Conjunction, MatchingOptions, TreeOptions};
pub use redis;
pub use reply::{Document, OutputMode, ReplyLayout, SearchResult, SpellcheckTerm};
pub use schema::{FieldDefinition, IndexSchema};
pub use transport::{RecordingTransport, RedisTransport, Transport};
