use anyhow::Result;
pub use tiktoken_rs::{get_bpe_from_model, CoreBPE};

use crate::utils::token::CountToken;

/// Counter using the Tiktoken tokenizer.
#[derive(Clone)]
#[readonly::make]
pub struct Tiktoken {
    /// The model name the tokenizer was resolved from. read-only.
    pub model: String,
    /// The tokenizer. read-only.
    pub bpe: CoreBPE,
}

impl Tiktoken {
    /// Create a counter for a model name known to tiktoken.
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let bpe = get_bpe_from_model(&model)?;
        Ok(Tiktoken { model, bpe })
    }
}

impl CountToken for Tiktoken {
    fn count_token(&self, string: &str) -> usize {
        self.bpe.encode_with_special_tokens(string).len()
    }
}

#[cfg(test)]
mod test_tiktoken {
    use super::Tiktoken;
    use crate::utils::token::CountToken;

    #[test]
    fn test_counts_fewer_tokens_than_chars() {
        let counter = Tiktoken::new("gpt-3.5-turbo").unwrap();
        let sentence = "The quick brown fox jumps over the lazy dog";
        let tokens = counter.count_token(sentence);
        assert!(tokens > 0);
        assert!(tokens < sentence.len());
    }
}
