use crate::errors::FtResult;
use crate::reply::{SearchResult, SpellcheckTerm, decode_spellcheck};
use crate::transport::Transport;

use super::{FT_SPELLCHECK, Query};

/// Whether a custom dictionary adds or removes suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermsMode {
    Include,
    Exclude,
}

impl TermsMode {
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            TermsMode::Include => "INCLUDE",
            TermsMode::Exclude => "EXCLUDE",
        }
    }
}

/// Option set for `FT.SPELLCHECK` against one index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpellcheckCommand {
    index: String,
    distance: Option<u8>,
    terms: Vec<(TermsMode, String)>,
}

impl SpellcheckCommand {
    pub fn new(index: impl Into<String>) -> Self {
        Self {
            index: index.into(),
            distance: None,
            terms: Vec::new(),
        }
    }

    #[inline]
    pub fn distance(mut self, distance: u8) -> Self {
        self.distance = Some(distance);
        self
    }

    #[inline]
    pub fn include_terms(mut self, dictionary: impl Into<String>) -> Self {
        self.terms.push((TermsMode::Include, dictionary.into()));
        self
    }

    #[inline]
    pub fn exclude_terms(mut self, dictionary: impl Into<String>) -> Self {
        self.terms.push((TermsMode::Exclude, dictionary.into()));
        self
    }

    pub fn build_args<'q>(&self, query: impl Into<Query<'q>>) -> Vec<String> {
        let mut args = vec![self.index.clone(), query.into().resolve()];
        if let Some(distance) = self.distance {
            args.push("DISTANCE".to_string());
            args.push(distance.to_string());
        }
        for (mode, dictionary) in &self.terms {
            args.extend(["TERMS".to_string(), mode.as_str().to_string(), dictionary.clone()]);
        }
        args
    }

    /// Send `FT.SPELLCHECK` and decode one entry per misspelled term.
    pub async fn spellcheck<'q, T>(
        &self,
        transport: &mut T,
        query: impl Into<Query<'q>>,
    ) -> FtResult<SearchResult<SpellcheckTerm>>
    where
        T: Transport,
    {
        let args = self.build_args(query);
        let raw = transport.send(FT_SPELLCHECK, &args).await?;
        decode_spellcheck(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_distance_and_dictionaries_in_order() {
        let args = SpellcheckCommand::new("idx")
            .distance(2)
            .include_terms("brands")
            .exclude_terms("slang")
            .build_args("helo wrld");
        assert_eq!(
            args,
            ["idx", "helo wrld", "DISTANCE", "2", "TERMS", "INCLUDE", "brands", "TERMS", "EXCLUDE", "slang"]
        );
    }

    #[test]
    fn bare_command_has_index_and_query_only() {
        assert_eq!(SpellcheckCommand::new("idx").build_args("helo"), ["idx", "helo"]);
    }
}
