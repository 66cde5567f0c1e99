//! # Config
//! Explicit configuration for the external collaborators, read from process environment
//! variables before anything else is constructed.
//!
//! Every collaborator takes its configuration struct at construction time; there is no
//! process-wide mutable state. A missing required variable fails fast with
//! [MissingEnvVar](errors::MissingEnvVar), before any pipeline is built.

use std::env;

use anyhow::Result;
use url::Url;

use crate::config::errors::{InvalidEnvVar, MissingEnvVar};

/// Default sampling temperature of the original tutorial setups.
pub const DEFAULT_TEMPERATURE: f32 = 0.5;

const DEFAULT_CHAT_MODEL: &str = "gpt-3.5-turbo";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";

/// Read a required environment variable.
pub fn require_var(name: &str) -> Result<String, MissingEnvVar> {
    env::var(name).map_err(|_| MissingEnvVar { name: name.to_string() })
}

/// Read an optional environment variable. Empty values count as unset.
pub fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.is_empty())
}

/// Read an environment variable with a fallback default.
pub fn var_or(name: &str, default: &str) -> String {
    optional_var(name).unwrap_or_else(|| default.to_string())
}

/// Configuration of the chat completion client.
///
/// Reads `OPENAI_API_KEY` (required), `OPENAI_API_BASE` (optional, for OpenAI-compatible
/// providers such as OpenRouter) and `CHAT_MODEL` (optional).
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
    pub temperature: f32,
}

impl LlmConfig {
    pub fn from_env() -> Result<Self, MissingEnvVar> {
        Ok(Self {
            api_key: require_var("OPENAI_API_KEY")?,
            api_base: optional_var("OPENAI_API_BASE"),
            model: var_or("CHAT_MODEL", DEFAULT_CHAT_MODEL),
            temperature: DEFAULT_TEMPERATURE,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// Configuration of the embedding client.
///
/// Reads `OPENAI_API_KEY` (required), `OPENAI_API_BASE` (optional) and `EMBEDDING_MODEL`
/// (optional).
#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub api_key: String,
    pub api_base: Option<String>,
    pub model: String,
}

impl EmbeddingConfig {
    pub fn from_env() -> Result<Self, MissingEnvVar> {
        Ok(Self {
            api_key: require_var("OPENAI_API_KEY")?,
            api_base: optional_var("OPENAI_API_BASE"),
            model: var_or("EMBEDDING_MODEL", DEFAULT_EMBEDDING_MODEL),
        })
    }
}

/// Configuration of the vector store.
///
/// Reads `QDRANT_URL`, `QDRANT_API_KEY` and `QDRANT_COLLECTION`, all required.
#[derive(Debug, Clone)]
pub struct VectorStoreConfig {
    pub url: Url,
    pub api_key: String,
    pub collection: String,
}

impl VectorStoreConfig {
    pub fn from_env() -> Result<Self> {
        let raw_url = require_var("QDRANT_URL")?;
        let url = Url::parse(&raw_url).map_err(|parse_error| InvalidEnvVar {
            name: "QDRANT_URL".to_string(),
            message: parse_error.to_string(),
        })?;
        Ok(Self {
            url,
            api_key: require_var("QDRANT_API_KEY")?,
            collection: require_var("QDRANT_COLLECTION")?,
        })
    }
}

pub mod errors {
    use std::error::Error;
    use std::fmt;
    use std::fmt::Formatter;

    /// Error when a required environment variable is absent.
    #[derive(Debug, Clone)]
    pub struct MissingEnvVar {
        pub name: String,
    }

    impl fmt::Display for MissingEnvVar {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "Missing required environment variable: {}", self.name)
        }
    }

    impl Error for MissingEnvVar {}

    /// Error when an environment variable is present but its value cannot be used.
    #[derive(Debug, Clone)]
    pub struct InvalidEnvVar {
        pub name: String,
        pub message: String,
    }

    impl fmt::Display for InvalidEnvVar {
        fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
            write!(f, "Invalid environment variable {}: {}", self.name, self.message)
        }
    }

    impl Error for InvalidEnvVar {}
}

#[cfg(test)]
mod test_config {
    use std::env;

    use super::{require_var, var_or};

    #[test]
    fn test_require_var_reports_the_name() {
        let error = require_var("PROMPTPIPE_TEST_SURELY_UNSET").unwrap_err();
        assert_eq!(error.name, "PROMPTPIPE_TEST_SURELY_UNSET");
        assert_eq!(
            error.to_string(),
            "Missing required environment variable: PROMPTPIPE_TEST_SURELY_UNSET"
        );
    }

    #[test]
    fn test_var_or_falls_back() {
        env::remove_var("PROMPTPIPE_TEST_FALLBACK");
        assert_eq!(var_or("PROMPTPIPE_TEST_FALLBACK", "default"), "default");
        env::set_var("PROMPTPIPE_TEST_FALLBACK", "configured");
        assert_eq!(var_or("PROMPTPIPE_TEST_FALLBACK", "default"), "configured");
        env::remove_var("PROMPTPIPE_TEST_FALLBACK");
    }
}
