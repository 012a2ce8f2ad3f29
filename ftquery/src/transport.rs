//! The single seam between command builders and Redis.
//!
//! Builders hand a command name plus its frozen argument list to a [`Transport`] and get
//! the raw reply back. [`RedisTransport`] forwards to any async `redis` connection;
//! [`RecordingTransport`] keeps the arguments and answers from a queue of canned replies,
//! which is what the tests and the CLI's `--dry-run` use.

use std::collections::VecDeque;
use std::fmt;

use log::debug;
use redis::Value;
use redis::aio::ConnectionLike;

use crate::errors::{FtError, FtResult};

#[allow(async_fn_in_trait)]
pub trait Transport {
    async fn send(&mut self, command: &str, args: &[String]) -> FtResult<Value>;
}

pub struct RedisTransport<'a, C>
where
    C: ConnectionLike + Send,
{
    connection: &'a mut C,
}

impl<'a, C> RedisTransport<'a, C>
where
    C: ConnectionLike + Send,
{
    pub fn new(connection: &'a mut C) -> Self {
        Self { connection }
    }
}

impl<C> Transport for RedisTransport<'_, C>
where
    C: ConnectionLike + Send,
{
    async fn send(&mut self, command: &str, args: &[String]) -> FtResult<Value> {
        debug!("{} {}", command, args.join(" "));
        let mut cmd = redis::cmd(command);
        for arg in args {
            cmd.arg(arg.as_str());
        }
        let reply: Value = cmd.query_async(&mut *self.connection).await.map_err(FtError::from)?;
        debug!("{} replied {:?}", command, reply);
        Ok(reply)
    }
}

/// One command captured by a [`RecordingTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentCommand {
    pub name: String,
    pub args: Vec<String>,
}

impl fmt::Display for SentCommand {
    /// Renders the command the way `redis-cli` would accept it.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"') {
                write!(f, " \"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\""))?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Transport that records every command and answers from a reply queue.
///
/// Once the queue is drained every further command is answered with `Nil`.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    sent: Vec<SentCommand>,
    replies: VecDeque<FtResult<Value>>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reply(mut self, reply: Value) -> Self {
        self.push_reply(reply);
        self
    }

    pub fn push_reply(&mut self, reply: Value) -> &mut Self {
        self.replies.push_back(Ok(reply));
        self
    }

    pub fn push_error(&mut self, error: redis::RedisError) -> &mut Self {
        self.replies.push_back(Err(FtError::from(error)));
        self
    }

    #[inline]
    pub fn sent(&self) -> &[SentCommand] {
        &self.sent
    }

    #[inline]
    pub fn last(&self) -> Option<&SentCommand> {
        self.sent.last()
    }

    pub fn take_sent(&mut self) -> Vec<SentCommand> {
        std::mem::take(&mut self.sent)
    }
}

impl Transport for RecordingTransport {
    async fn send(&mut self, command: &str, args: &[String]) -> FtResult<Value> {
        let sent = SentCommand {
            name: command.to_string(),
            args: args.to_vec(),
        };
        debug!("recorded {}", sent);
        self.sent.push(sent);
        self.replies.pop_front().unwrap_or(Ok(Value::Nil))
    }
}
