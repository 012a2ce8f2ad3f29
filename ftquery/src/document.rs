use log::warn;
use uuid::Uuid;

pub const SCORE_FIELD: &str = "__score";
pub const LANGUAGE_FIELD: &str = "__language";
pub const PAYLOAD_FIELD: &str = "__payload";

/// A document to be written into an indexed keyspace.
///
/// Field order is preserved exactly as added.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexDocument {
    id: String,
    fields: Vec<(String, String)>,
    score: Option<f64>,
    language: Option<String>,
    payload: Option<String>,
}

impl Default for IndexDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexDocument {
    /// A document with a random UUID id.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4().to_string())
    }

    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
            score: None,
            language: None,
            payload: None,
        }
    }

    #[inline]
    pub fn id(&self) -> &str {
        &self.id
    }

    #[inline]
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    #[inline]
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    #[inline]
    pub fn field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push((name.into(), value.into()));
        self
    }

    pub fn with_fields<I, K, V>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.fields
            .extend(fields.into_iter().map(|(name, value)| (name.into(), value.into())));
        self
    }

    /// Scores outside `0.0..=1.0` are replaced by `1.0`.
    pub fn with_score(mut self, score: f64) -> Self {
        let clamped = if (0.0..=1.0).contains(&score) {
            score
        } else {
            warn!("document {} score {} is outside 0..=1, using 1.0", self.id, score);
            1.0
        };
        self.score = Some(clamped);
        self
    }

    #[inline]
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    #[inline]
    pub fn with_payload(mut self, payload: impl Into<String>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Ordered name/value pairs, followed by the reserved score, language and payload
    /// fields when those are set.
    pub fn definition(&self) -> Vec<(String, String)> {
        let mut pairs = self.fields.clone();
        if let Some(score) = self.score {
            pairs.push((SCORE_FIELD.to_string(), score.to_string()));
        }
        if let Some(language) = &self.language {
            pairs.push((LANGUAGE_FIELD.to_string(), language.clone()));
        }
        if let Some(payload) = &self.payload {
            pairs.push((PAYLOAD_FIELD.to_string(), payload.clone()));
        }
        pairs
    }

    /// Arguments of `HSET` storing this document under `prefix + id`.
    pub fn hset_args(&self, prefix: &str) -> Vec<String> {
        let mut args = vec![self.key(prefix)];
        for (name, value) in self.definition() {
            args.push(name);
            args.push(value);
        }
        args
    }

    #[inline]
    pub fn key(&self, prefix: &str) -> String {
        format!("{}{}", prefix, self.id)
    }
}
