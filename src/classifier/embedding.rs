// src/classifier/embedding.rs

use std::path::Path;
use std::sync::Mutex;

use ort::{
    init, inputs,
    session::builder::GraphOptimizationLevel,
    session::Session,
    value::Value,
};
use tokenizers::tokenizer::Tokenizer;

use crate::utils::error::EmbeddingError;

// Headings are short; anything longer is content and gets truncated.
const MAX_TOKENS: usize = 128;

/// Backend producing fixed-length sentence vectors.
///
/// The classifier only depends on this trait, so tests can substitute a
/// deterministic in-memory provider for the ONNX model.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Cosine similarity between two vectors. Returns 0.0 for zero-norm or
/// mismatched-length inputs rather than NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Multilingual sentence-embedding model served through ONNX Runtime.
///
/// Expects `model.onnx` and `tokenizer.json` in the models directory (a
/// sentence-transformers MiniLM-style export). The output sentence vector is
/// the attention-mask-weighted mean of the last hidden state, L2-normalized.
pub struct OnnxEmbedder {
    // Session::run needs a mutable receiver; the pipeline itself is
    // single-threaded so the lock is uncontended.
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    needs_token_type_ids: bool,
}

impl OnnxEmbedder {
    pub fn new<P: AsRef<Path>>(models_dir: P) -> Result<Self, EmbeddingError> {
        let model_path = models_dir.as_ref().join("model.onnx");
        let tokenizer_path = models_dir.as_ref().join("tokenizer.json");

        // Initialize ONNX Runtime (only needs to be done once)
        let _ = init();

        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(4)?))
            .and_then(|mut b| Ok(b.commit_from_file(&model_path)?))
            .map_err(|e| {
                EmbeddingError::ModelLoad(format!("{}: {}", model_path.display(), e))
            })?;

        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            EmbeddingError::ModelLoad(format!("{}: {}", tokenizer_path.display(), e))
        })?;

        // BERT-style exports carry a token_type_ids input, XLM-R-style ones
        // do not; check once instead of failing per call.
        let needs_token_type_ids = session
            .inputs()
            .iter()
            .any(|input| input.name() == "token_type_ids");

        tracing::info!(
            "Loaded embedding model from {} ({} inputs)",
            model_path.display(),
            session.inputs().len()
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            needs_token_type_ids,
        })
    }
}

impl EmbeddingProvider for OnnxEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| EmbeddingError::Tokenize(e.to_string()))?;

        let ids: Vec<i64> = encoding
            .get_ids()
            .iter()
            .take(MAX_TOKENS)
            .map(|&id| id as i64)
            .collect();
        let mask: Vec<i64> = encoding
            .get_attention_mask()
            .iter()
            .take(MAX_TOKENS)
            .map(|&m| m as i64)
            .collect();
        let seq_len = ids.len();
        if seq_len == 0 {
            return Err(EmbeddingError::Tokenize(format!(
                "tokenizer produced no tokens for {:?}",
                text
            )));
        }
        let mask_weights: Vec<f32> = mask.iter().map(|&m| m as f32).collect();

        let input_ids = Value::from_array(([1_usize, seq_len], ids.into_boxed_slice()))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        let attention_mask = Value::from_array(([1_usize, seq_len], mask.into_boxed_slice()))
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| EmbeddingError::Inference("embedding session lock poisoned".into()))?;

        let outputs = if self.needs_token_type_ids {
            let token_type_ids =
                Value::from_array(([1_usize, seq_len], vec![0_i64; seq_len].into_boxed_slice()))
                    .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
            session
                .run(inputs![
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask,
                    "token_type_ids" => token_type_ids
                ])
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?
        } else {
            session
                .run(inputs![
                    "input_ids" => input_ids,
                    "attention_mask" => attention_mask
                ])
                .map_err(|e| EmbeddingError::Inference(e.to_string()))?
        };

        // last_hidden_state: [1, seq_len, hidden]
        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| EmbeddingError::Inference(e.to_string()))?;
        let tokens = shape[1] as usize;
        let hidden = shape[2] as usize;

        // Mask-weighted mean pooling over the token axis.
        let mut pooled = vec![0.0_f32; hidden];
        let mut weight_sum = 0.0_f32;
        for t in 0..tokens.min(mask_weights.len()) {
            let w = mask_weights[t];
            if w == 0.0 {
                continue;
            }
            weight_sum += w;
            let row = &data[t * hidden..(t + 1) * hidden];
            for (acc, v) in pooled.iter_mut().zip(row) {
                *acc += w * v;
            }
        }
        if weight_sum > 0.0 {
            for v in pooled.iter_mut() {
                *v /= weight_sum;
            }
        }

        // L2-normalized sentence vector.
        let norm = pooled.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in pooled.iter_mut() {
                *v /= norm;
            }
        }

        Ok(pooled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![0.3, -0.5, 0.8];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn cosine_of_opposite_vectors_is_negative_one() {
        let sim = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]);
        assert!((sim + 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_handles_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
    }
}
