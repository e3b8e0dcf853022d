//! Text encoding into fixed-shape model inputs

use polarscore_core::{Error, Result};
use tokenizers::{
    PaddingDirection, PaddingParams, PaddingStrategy, Tokenizer, TruncationDirection,
    TruncationParams, TruncationStrategy,
};

/// Shaping rules applied to every encoded sequence
#[derive(Debug, Clone)]
pub struct EncoderSettings {
    /// Sequences longer than this are cut from the right
    pub max_length: usize,

    /// Padded length is rounded up to a multiple of this
    pub pad_to_multiple_of: Option<usize>,

    pub pad_id: u32,

    pub pad_token: String,
}

/// Install truncation and padding on a tokenizer
///
/// Padding uses the batch-longest strategy; with one sequence per request
/// the padded length is the sequence length, optionally rounded up.
pub fn configure_tokenizer(tokenizer: &mut Tokenizer, settings: &EncoderSettings) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams {
            direction: TruncationDirection::Right,
            max_length: settings.max_length,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
        }))
        .map_err(|e| Error::model_format(format!("Failed to configure truncation: {}", e)))?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        direction: PaddingDirection::Right,
        pad_to_multiple_of: settings.pad_to_multiple_of,
        pad_id: settings.pad_id,
        pad_type_id: 0,
        pad_token: settings.pad_token.clone(),
    }));

    Ok(())
}

/// Token ids, token type ids and attention mask of one sequence
///
/// All three vectors have the same non-zero length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedInput {
    input_ids: Vec<u32>,
    type_ids: Vec<u32>,
    attention_mask: Vec<u32>,
}

impl EncodedInput {
    pub fn input_ids(&self) -> &[u32] {
        &self.input_ids
    }

    pub fn type_ids(&self) -> &[u32] {
        &self.type_ids
    }

    /// 1 for real tokens, 0 for padding
    pub fn attention_mask(&self) -> &[u32] {
        &self.attention_mask
    }

    /// Padded sequence length
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of non-padding tokens
    pub fn real_tokens(&self) -> usize {
        self.attention_mask.iter().filter(|&&m| m != 0).count()
    }
}

/// Encode text with special tokens, truncation and padding
///
/// Empty text is valid. A tokenizer without special tokens can produce no
/// tokens at all; that case is padded to a single masked position so the
/// result still has a usable shape.
pub fn encode(text: &str, tokenizer: &Tokenizer) -> Result<EncodedInput> {
    let encoding = tokenizer
        .encode(text, true)
        .map_err(|e| Error::encoding(format!("Tokenization failed: {}", e)))?;

    let mut encoded = EncodedInput {
        input_ids: encoding.get_ids().to_vec(),
        type_ids: encoding.get_type_ids().to_vec(),
        attention_mask: encoding.get_attention_mask().to_vec(),
    };

    if encoded.is_empty() {
        let pad_id = tokenizer.get_padding().map(|p| p.pad_id).unwrap_or(0);
        encoded.input_ids.push(pad_id);
        encoded.type_ids.push(0);
        encoded.attention_mask.push(0);
    }

    tracing::trace!(
        "Encoded {} chars into {} tokens ({} real)",
        text.len(),
        encoded.len(),
        encoded.real_tokens()
    );

    Ok(encoded)
}
