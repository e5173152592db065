//! Sentence embeddings from a local BERT checkpoint.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use medrag_core::config::EmbeddingSettings;
use medrag_core::error::Error;
use medrag_core::traits::Embedder;
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::{configure_truncation, tokenize_on_device};

pub struct BertEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    id: String,
}

impl BertEmbedder {
    pub fn new(settings: &EmbeddingSettings) -> Result<Self> {
        let model_dir = resolve_model_dir(settings)?;
        let device = select_device(&settings.device);
        info!(model = %settings.model_name, dir = %model_dir.display(), "loading embedding model");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e))?;
        configure_truncation(&mut tokenizer, settings.max_len)?;

        let config_path = model_dir.join("config.json");
        let raw = std::fs::read_to_string(&config_path)
            .with_context(|| format!("reading {}", config_path.display()))?;
        let config: BertConfig = serde_json::from_str(&raw).context("parsing BERT config")?;
        let dim = serde_json::from_str::<serde_json::Value>(&raw)?
            .get("hidden_size")
            .and_then(|v| v.as_u64())
            .ok_or_else(|| anyhow!("config.json has no hidden_size"))? as usize;

        let vb = load_weights(&model_dir, &device)?;
        let model = BertModel::load(vb, &config).context("building BERT model")?;

        let short_name = settings.model_name.rsplit('/').next().unwrap_or(&settings.model_name);
        let id = format!("bert:{short_name}:d{dim}");
        info!(id = %id, "embedding model ready");
        Ok(Self { model, tokenizer, device, dim, id })
    }

    fn embed_one(&self, text: &str) -> Result<Vec<f32>> {
        let start = Instant::now();
        let enc = tokenize_on_device(&self.tokenizer, text, &self.device)?;
        let hidden = self.model.forward(&enc.input_ids, &enc.token_type_ids, Some(&enc.attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &enc.attention_mask)?;
        let v: Vec<f32> = pooled.to_device(&Device::Cpu)?.to_dtype(DType::F32)?.squeeze(0)?.to_vec1()?;
        if v.len() != self.dim {
            return Err(anyhow!("model produced {} dims, expected {}", v.len(), self.dim));
        }
        debug!(elapsed_ms = start.elapsed().as_millis() as u64, chars = text.chars().count(), "embedded");
        Ok(v)
    }
}

impl Embedder for BertEmbedder {
    fn id(&self) -> &str {
        &self.id
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|t| self.embed_one(t)).collect()
    }
}

/// `model.safetensors` when present, else the PyTorch pickle.
fn load_weights(model_dir: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        // SAFETY: the weights file is not modified while the model is alive.
        let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[safetensors], DType::F32, device)? };
        return Ok(vb);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if !pickle.exists() {
        let reason = format!("no model.safetensors or pytorch_model.bin in {}", model_dir.display());
        return Err(Error::ModelUnavailable(reason).into());
    }
    let weights = candle_core::pickle::read_all(&pickle)?;
    let weights_map: HashMap<String, Tensor> = weights.into_iter().collect();
    Ok(VarBuilder::from_tensors(weights_map, DType::F32, device))
}

/// Configured `model_dir`, then `APP_MODEL_DIR`/`MODEL_DIR`, then
/// `models/<model name>` under the working directory.
fn resolve_model_dir(settings: &EmbeddingSettings) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    candidates.extend(settings.model_dir.clone());
    for var in ["APP_MODEL_DIR", "MODEL_DIR"] {
        if let Ok(dir) = std::env::var(var) {
            candidates.push(PathBuf::from(dir));
        }
    }
    let short_name = settings.model_name.rsplit('/').next().unwrap_or(&settings.model_name);
    candidates.push(Path::new("models").join(short_name));

    candidates
        .into_iter()
        .find(|p| p.join("tokenizer.json").exists())
        .ok_or_else(|| {
            Error::ModelUnavailable(format!("could not locate model directory for {}", settings.model_name)).into()
        })
}
