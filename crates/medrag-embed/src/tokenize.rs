use anyhow::{anyhow, Result};
use candle_core::{Device, Tensor};
use tokenizers::{Tokenizer, TruncationParams};

/// Encoded single input, shaped `[1, T]`.
pub struct Encoded {
    pub input_ids: Tensor,
    pub token_type_ids: Tensor,
    pub attention_mask: Tensor,
}

/// Cap encodings at `max_len` tokens including `[CLS]`/`[SEP]`, and drop any
/// padding the tokenizer file asks for.
pub fn configure_truncation(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    tokenizer
        .with_truncation(Some(TruncationParams { max_length: max_len, ..Default::default() }))
        .map_err(|e| anyhow!("invalid truncation for max_len {max_len}: {e}"))?;
    tokenizer.with_padding(None);
    Ok(())
}

/// Encode one text with special tokens. No padding: each text is encoded on
/// its own so its vector does not depend on batch neighbours.
pub fn tokenize_on_device(tokenizer: &Tokenizer, text: &str, device: &Device) -> Result<Encoded> {
    let enc = tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {}", e))?;
    let ids = enc.get_ids().to_vec();
    if ids.is_empty() {
        return Err(anyhow!("tokenizer produced no tokens"));
    }
    let len = ids.len();
    Ok(Encoded {
        input_ids: Tensor::from_iter(ids, device)?.reshape((1, len))?,
        token_type_ids: Tensor::from_iter(enc.get_type_ids().to_vec(), device)?.reshape((1, len))?,
        attention_mask: Tensor::from_iter(enc.get_attention_mask().to_vec(), device)?.reshape((1, len))?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const TOKENIZER_JSON: &str = r#"{
        "version": "1.0",
        "truncation": null,
        "padding": null,
        "added_tokens": [],
        "normalizer": null,
        "pre_tokenizer": {"type": "Whitespace"},
        "post_processor": {"type": "BertProcessing", "sep": ["[SEP]", 3], "cls": ["[CLS]", 2]},
        "decoder": null,
        "model": {
            "type": "WordLevel",
            "vocab": {"[UNK]": 0, "[PAD]": 1, "[CLS]": 2, "[SEP]": 3, "a": 4, "b": 5, "c": 6},
            "unk_token": "[UNK]"
        }
    }"#;

    fn ids(tokenizer: &Tokenizer, text: &str) -> Vec<u32> {
        let enc = tokenize_on_device(tokenizer, text, &Device::Cpu).expect("encode");
        enc.input_ids.to_vec2::<u32>().expect("ids").remove(0)
    }

    #[test]
    fn long_text_keeps_trailing_sep() {
        let mut tokenizer = Tokenizer::from_str(TOKENIZER_JSON).expect("tokenizer");
        configure_truncation(&mut tokenizer, 5).expect("truncation");
        assert_eq!(ids(&tokenizer, "a b c a b c"), vec![2, 4, 5, 6, 3]);
    }

    #[test]
    fn short_text_is_untouched() {
        let mut tokenizer = Tokenizer::from_str(TOKENIZER_JSON).expect("tokenizer");
        configure_truncation(&mut tokenizer, 5).expect("truncation");
        assert_eq!(ids(&tokenizer, "b"), vec![2, 5, 3]);
    }
}
