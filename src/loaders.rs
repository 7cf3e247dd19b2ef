//! Hugging Face Hub loaders for the sentiment model's files.
//!
//! - [`HfLoader`] - fetches one file from a repository revision, retrying lock failures
//! - [`TokenizerLoader`] - loads `tokenizer.json` configured for batched inference
//! - [`WeightsLoader`] - resolves `model.safetensors`, falling back to `pytorch_model.bin`
//!
//! Downloaded files land in the standard hub cache, so a second process start reads them
//! from disk.

use crate::core::{DashboardError, Result};
use hf_hub::{Repo, RepoType};
use std::path::PathBuf;
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};

const MAX_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
pub struct HfLoader {
    pub repo: String,
    pub revision: String,
    pub filename: String,
}

impl HfLoader {
    pub fn new(repo: &str, revision: &str, filename: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
            filename: filename.into(),
        }
    }

    pub async fn load(&self) -> Result<PathBuf> {
        let api = hf_hub::api::tokio::ApiBuilder::new()
            .with_progress(false)
            .build()?;
        let repo = api.repo(Repo::with_revision(
            self.repo.clone(),
            RepoType::Model,
            self.revision.clone(),
        ));

        let mut attempt = 0;
        loop {
            match repo.get(&self.filename).await {
                Ok(path) => {
                    tracing::debug!(repo = %self.repo, file = %self.filename, "resolved hub file");
                    return Ok(path);
                }
                Err(e) if attempt + 1 < MAX_RETRIES && e.to_string().contains("Lock acquisition failed") => {
                    let wait = std::time::Duration::from_millis(100 * (1 << attempt));
                    tracing::warn!(file = %self.filename, ?wait, "hub cache locked, retrying");
                    tokio::time::sleep(wait).await;
                    attempt += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

#[derive(Clone)]
pub struct TokenizerLoader {
    pub tokenizer_file_loader: HfLoader,
    pub max_length: usize,
    pub pad_id: u32,
}

impl TokenizerLoader {
    /// `pad_id` is the model config's padding token, used when `tokenizer.json` sets none.
    pub fn new(repo: &str, revision: &str, max_length: usize, pad_id: u32) -> Self {
        Self {
            tokenizer_file_loader: HfLoader::new(repo, revision, "tokenizer.json"),
            max_length,
            pad_id,
        }
    }

    pub async fn load(&self) -> Result<Tokenizer> {
        let path = self.tokenizer_file_loader.load().await?;
        let mut tokenizer = Tokenizer::from_file(path)
            .map_err(|e| DashboardError::Tokenization(format!("failed to load tokenizer: {e}")))?;
        configure_for_batches(&mut tokenizer, self.max_length, self.pad_id)?;
        Ok(tokenizer)
    }
}

/// Pad every batch to its longest member and cut inputs at the model's context size.
/// Padding already present in the tokenizer file wins over `default_pad_id`.
pub fn configure_for_batches(
    tokenizer: &mut Tokenizer,
    max_length: usize,
    default_pad_id: u32,
) -> Result<()> {
    let pad_id = tokenizer
        .get_padding()
        .map_or(default_pad_id, |p| p.pad_id);
    let pad_token = tokenizer
        .id_to_token(pad_id)
        .unwrap_or_else(|| "[PAD]".to_string());
    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| DashboardError::Tokenization(e.to_string()))?;
    Ok(())
}

#[derive(Clone)]
pub struct WeightsLoader {
    pub repo: String,
    pub revision: String,
}

impl WeightsLoader {
    pub fn new(repo: &str, revision: &str) -> Self {
        Self {
            repo: repo.into(),
            revision: revision.into(),
        }
    }

    pub async fn load(&self) -> Result<PathBuf> {
        match HfLoader::new(&self.repo, &self.revision, "model.safetensors")
            .load()
            .await
        {
            Ok(path) => Ok(path),
            Err(first) => HfLoader::new(&self.repo, &self.revision, "pytorch_model.bin")
                .load()
                .await
                .map_err(|e| {
                    DashboardError::Download(format!(
                        "model weights not found in {}: expected model.safetensors ({first}) or pytorch_model.bin ({e})",
                        self.repo
                    ))
                }),
        }
    }
}

pub async fn load_config_json(repo: &str, revision: &str) -> Result<String> {
    let path = HfLoader::new(repo, revision, "config.json").load().await?;
    Ok(tokio::fs::read_to_string(&path).await?)
}
