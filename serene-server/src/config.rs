//! Process configuration read from the environment.

use std::net::SocketAddr;
use std::str::FromStr;

use serene_rag::{ChunkingStrategy, RagConfig, RagError, Result};

/// Everything the server needs to start, resolved once at startup.
#[derive(Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Glob of plain-text documents ingested at startup.
    pub documents: String,
    /// The only origin allowed by CORS.
    pub allowed_origin: String,
    pub openai_api_key: String,
    pub gemini_api_key: String,
    pub chat_model: String,
    pub embedding_model: String,
    /// Model used for conversation titles.
    pub gemini_model: String,
    /// Model used for survey recommendations.
    pub survey_model: String,
    pub rag: RagConfig,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("documents", &self.documents)
            .field("allowed_origin", &self.allowed_origin)
            .field("chat_model", &self.chat_model)
            .field("embedding_model", &self.embedding_model)
            .field("gemini_model", &self.gemini_model)
            .field("survey_model", &self.survey_model)
            .field("rag", &self.rag)
            .finish_non_exhaustive()
    }
}

fn parse_var<T: FromStr>(key: &str, value: Option<String>, default: T) -> Result<T> {
    match value {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| RagError::ConfigError(format!("{key} has an invalid value '{raw}'"))),
    }
}

impl ServerConfig {
    /// Read the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ServerConfig::from_lookup`].
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read the configuration through `lookup`, which maps a variable name
    /// to its value. Blank values count as unset.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] when an API key is missing, a number
    /// does not parse, or the resulting [`RagConfig`] is inconsistent.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let or_default = |key: &str, default: &str| var(key).unwrap_or_else(|| default.to_string());
        let required = |key: &str| {
            var(key).ok_or_else(|| RagError::ConfigError(format!("{key} must be set")))
        };

        let defaults = RagConfig::default();
        let rag = RagConfig::builder()
            .chunk_size(parse_var(
                "SERENE_CHUNK_SIZE",
                var("SERENE_CHUNK_SIZE"),
                defaults.chunk_size,
            )?)
            .chunk_overlap(parse_var(
                "SERENE_CHUNK_OVERLAP",
                var("SERENE_CHUNK_OVERLAP"),
                defaults.chunk_overlap,
            )?)
            .chunking(match var("SERENE_CHUNKING") {
                Some(raw) => raw.parse::<ChunkingStrategy>()?,
                None => defaults.chunking,
            })
            .top_k(parse_var("SERENE_TOP_K", var("SERENE_TOP_K"), defaults.top_k)?)
            .call_timeout_secs(parse_var(
                "SERENE_CALL_TIMEOUT_SECS",
                var("SERENE_CALL_TIMEOUT_SECS"),
                defaults.call_timeout_secs,
            )?)
            .max_attempts(parse_var(
                "SERENE_MAX_ATTEMPTS",
                var("SERENE_MAX_ATTEMPTS"),
                defaults.max_attempts,
            )?)
            .build()?;

        Ok(Self {
            host: or_default("SERENE_HOST", "0.0.0.0"),
            port: parse_var("SERENE_PORT", var("SERENE_PORT"), 5000)?,
            documents: or_default("SERENE_DOCUMENTS", serene_rag::loader::DEFAULT_PATTERN),
            allowed_origin: or_default("SERENE_ALLOWED_ORIGIN", "http://www.serenespaceai.com"),
            openai_api_key: required("OPENAI_API_KEY")?,
            gemini_api_key: required("GEMINI_API_KEY")?,
            chat_model: or_default("SERENE_CHAT_MODEL", "gpt-4"),
            embedding_model: or_default("SERENE_EMBEDDING_MODEL", "text-embedding-3-large"),
            gemini_model: or_default("SERENE_GEMINI_MODEL", "gemini-1.5-flash"),
            survey_model: or_default("SERENE_SURVEY_MODEL", "gemini-2.5-flash"),
            rag,
        })
    }

    /// The socket address to bind.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::ConfigError`] if host and port do not form an address.
    pub fn addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port).parse().map_err(|_| {
            RagError::ConfigError(format!("invalid listen address {}:{}", self.host, self.port))
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key: &str| vars.get(key).cloned()
    }

    const KEYS: [(&str, &str); 2] = [("OPENAI_API_KEY", "sk-test"), ("GEMINI_API_KEY", "g-test")];

    #[test]
    fn defaults_apply_when_only_keys_are_set() {
        let config = ServerConfig::from_lookup(lookup(&KEYS)).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.documents, "documents/*.txt");
        assert_eq!(config.allowed_origin, "http://www.serenespaceai.com");
        assert_eq!(config.chat_model, "gpt-4");
        assert_eq!(config.survey_model, "gemini-2.5-flash");
        assert_eq!(config.rag, RagConfig::default());
        assert_eq!(config.addr().unwrap().port(), 5000);
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));

        let blank = ServerConfig::from_lookup(lookup(&[("OPENAI_API_KEY", " "), KEYS[1]]));
        assert!(blank.is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let mut pairs = KEYS.to_vec();
        pairs.extend([
            ("SERENE_PORT", "8080"),
            ("SERENE_CHUNK_SIZE", "500"),
            ("SERENE_CHUNK_OVERLAP", "50"),
            ("SERENE_TOP_K", "2"),
            ("SERENE_CHUNKING", "recursive"),
            ("SERENE_MAX_ATTEMPTS", "5"),
        ]);
        let config = ServerConfig::from_lookup(lookup(&pairs)).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.rag.chunk_size, 500);
        assert_eq!(config.rag.chunk_overlap, 50);
        assert_eq!(config.rag.top_k, 2);
        assert_eq!(config.rag.chunking, ChunkingStrategy::Recursive);
        assert_eq!(config.rag.max_attempts, 5);
    }

    #[test]
    fn invalid_numbers_are_errors() {
        let mut pairs = KEYS.to_vec();
        pairs.push(("SERENE_PORT", "five thousand"));
        let err = ServerConfig::from_lookup(lookup(&pairs)).unwrap_err();
        assert!(err.to_string().contains("SERENE_PORT"));

        let mut pairs = KEYS.to_vec();
        pairs.push(("SERENE_CHUNK_OVERLAP", "1000"));
        assert!(ServerConfig::from_lookup(lookup(&pairs)).is_err());
    }

    #[test]
    fn debug_output_hides_keys() {
        let config = ServerConfig::from_lookup(lookup(&KEYS)).unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("g-test"));
    }
}
