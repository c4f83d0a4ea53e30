//! BGE-M3 loaded from local files via candle.

use anyhow::{anyhow, Result};
use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use std::path::Path;
use tokenizers::Tokenizer;

use crate::device::select_device;
use crate::pool::masked_mean_l2;
use crate::tokenize::tokenize_on_device;

pub struct PrimaryModel {
    model: XLMRobertaModel,
    tokenizer: Tokenizer,
    device: Device,
    dimension: usize,
    max_len: usize,
}

impl PrimaryModel {
    /// Load tokenizer, config, and pickle weights from `model_dir`
    /// (tokenizer.json, config.json, pytorch_model.bin).
    pub fn load(model_dir: &Path, dimension: usize, max_len: usize) -> Result<Self> {
        let device = select_device();
        println!("🔄 Loading BGE-M3 model from {}...", model_dir.display());

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path).map_err(|e| {
            anyhow!(
                "Failed to load tokenizer from {}: {}",
                tokenizer_path.display(),
                e
            )
        })?;

        let config_path = model_dir.join("config.json");
        let config: XLMRobertaConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights_path = model_dir.join("pytorch_model.bin");
        let weights = candle_core::pickle::read_all(&weights_path)?;
        let weights_map: std::collections::HashMap<String, Tensor> =
            weights.into_iter().collect();
        let vb = VarBuilder::from_tensors(weights_map, DType::F32, &device);
        let model = XLMRobertaModel::new(&config, vb)?;
        println!("✅ BGE-M3 model loaded");

        Ok(Self {
            model,
            tokenizer,
            device,
            dimension,
            max_len,
        })
    }

    /// One forward pass: tokenize, encode, masked mean pool, L2 normalize.
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let (input_ids, attention_mask) =
            tokenize_on_device(&self.tokenizer, text, self.max_len, &self.device)?;
        let token_type_ids = Tensor::zeros((1, self.max_len), DType::I64, &self.device)?;
        let hidden_states =
            self.model
                .forward(&input_ids, &attention_mask, &token_type_ids, None, None, None)?;
        let pooled = masked_mean_l2(&hidden_states, &attention_mask)?;
        let vector: Vec<f32> = pooled.to_device(&Device::Cpu)?.squeeze(0)?.to_vec1()?;
        if vector.len() != self.dimension {
            return Err(anyhow!(
                "model produced {} dims, expected {}",
                vector.len(),
                self.dimension
            ));
        }
        Ok(vector)
    }
}
