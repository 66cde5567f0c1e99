pub mod embedding;
pub mod llm;
pub mod loaders;
pub mod postprocess;
pub(crate) mod prompt_processing;
pub mod splitting;
pub mod token;
#[cfg(feature = "qdrant")]
pub mod vec_stores;

use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;
