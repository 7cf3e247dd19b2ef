//! ModernBERT encoder with a sequence-classification head.
//!
//! ModernBERT alternates global attention layers with sliding-window (local) attention
//! layers, each with its own rotary embedding base. Only the classification head is
//! implemented here; it pools the final hidden states (CLS token or masked mean) and maps
//! them onto the label logits described by the model's `id2label` table.

use candle_core::{DType, Device, IndexOp, Result, Tensor, D};
use candle_nn::{
    embedding, layer_norm_no_bias, linear, linear_no_bias, ops::softmax, Embedding, LayerNorm,
    Linear, Module, VarBuilder,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;

const MASK_MIN: f64 = f32::MIN as f64;

/// The subset of `config.json` the encoder needs.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    pub vocab_size: usize,
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    pub max_position_embeddings: usize,
    pub layer_norm_eps: f64,
    pub pad_token_id: u32,
    pub global_attn_every_n_layers: usize,
    pub global_rope_theta: f64,
    pub local_attention: usize,
    pub local_rope_theta: f64,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    #[serde(default)]
    pub classifier_pooling: Pooling,
}

impl Config {
    pub fn num_labels(&self) -> usize {
        self.id2label.len()
    }

    /// Labels ordered by class index, upper-cased (`positive` -> `POSITIVE`).
    pub fn labels(&self) -> std::result::Result<Vec<String>, String> {
        let mut labels = vec![None; self.id2label.len()];
        for (id, label) in &self.id2label {
            let index: usize = id
                .parse()
                .map_err(|_| format!("id2label key '{id}' is not an index"))?;
            let slot = labels
                .get_mut(index)
                .ok_or_else(|| format!("id2label index {index} out of range"))?;
            *slot = Some(label.to_uppercase());
        }
        labels
            .into_iter()
            .enumerate()
            .map(|(i, label)| label.ok_or_else(|| format!("id2label has no entry for class {i}")))
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pooling {
    Cls,
    #[default]
    Mean,
}

#[derive(Debug, Clone)]
struct RotaryEmbedding {
    sin: Tensor,
    cos: Tensor,
}

impl RotaryEmbedding {
    fn new(dtype: DType, config: &Config, theta: f64, device: &Device) -> Result<Self> {
        let head_dim = config.hidden_size / config.num_attention_heads;
        let inv_freq: Vec<f32> = (0..head_dim)
            .step_by(2)
            .map(|i| (1.0 / theta.powf(i as f64 / head_dim as f64)) as f32)
            .collect();
        let half = inv_freq.len();
        let inv_freq = Tensor::from_vec(inv_freq, (1, half), device)?.to_dtype(dtype)?;
        let max_len = config.max_position_embeddings;
        let positions = Tensor::arange(0u32, max_len as u32, device)?
            .to_dtype(dtype)?
            .reshape((max_len, 1))?;
        let angles = positions.matmul(&inv_freq)?;
        Ok(Self {
            sin: angles.sin()?,
            cos: angles.cos()?,
        })
    }

    fn apply(&self, q: &Tensor, k: &Tensor) -> Result<(Tensor, Tensor)> {
        let seq_len = q.dim(2)?;
        let cos = self.cos.narrow(0, 0, seq_len)?;
        let sin = self.sin.narrow(0, 0, seq_len)?;
        let q = candle_nn::rotary_emb::rope(&q.contiguous()?, &cos, &sin)?;
        let k = candle_nn::rotary_emb::rope(&k.contiguous()?, &cos, &sin)?;
        Ok((q, k))
    }
}

#[derive(Debug, Clone)]
struct SelfAttention {
    wqkv: Linear,
    wo: Linear,
    heads: usize,
    head_dim: usize,
    rotary: Arc<RotaryEmbedding>,
}

impl SelfAttention {
    fn load(vb: VarBuilder, config: &Config, rotary: Arc<RotaryEmbedding>) -> Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            wqkv: linear_no_bias(hidden, hidden * 3, vb.pp("Wqkv"))?,
            wo: linear_no_bias(hidden, hidden, vb.pp("Wo"))?,
            heads: config.num_attention_heads,
            head_dim: hidden / config.num_attention_heads,
            rotary,
        })
    }

    fn forward(&self, xs: &Tensor, mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len, hidden) = xs.dims3()?;

        // (3, batch, heads, seq, head_dim)
        let qkv = xs
            .apply(&self.wqkv)?
            .reshape((batch, seq_len, 3, self.heads, self.head_dim))?
            .permute((2, 0, 3, 1, 4))?;
        let (q, k) = self.rotary.apply(&qkv.get(0)?, &qkv.get(1)?)?;
        let v = qkv.get(2)?.contiguous()?;

        let q = (q * (self.head_dim as f64).powf(-0.5))?;
        let scores = q
            .matmul(&k.transpose(D::Minus2, D::Minus1)?)?
            .broadcast_add(mask)?;
        let probs = softmax(&scores, D::Minus1)?;

        probs
            .matmul(&v)?
            .transpose(1, 2)?
            .reshape((batch, seq_len, hidden))?
            .apply(&self.wo)
    }
}

/// GeGLU feed-forward block.
#[derive(Debug, Clone)]
struct GatedMlp {
    wi: Linear,
    wo: Linear,
}

impl GatedMlp {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            wi: linear_no_bias(config.hidden_size, config.intermediate_size * 2, vb.pp("Wi"))?,
            wo: linear_no_bias(config.intermediate_size, config.hidden_size, vb.pp("Wo"))?,
        })
    }
}

impl Module for GatedMlp {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let halves = xs.apply(&self.wi)?.chunk(2, D::Minus1)?;
        (halves[0].gelu_erf()? * &halves[1])?.apply(&self.wo)
    }
}

#[derive(Debug, Clone)]
struct EncoderLayer {
    attn_norm: Option<LayerNorm>,
    attn: SelfAttention,
    mlp_norm: LayerNorm,
    mlp: GatedMlp,
    local: bool,
}

impl EncoderLayer {
    fn load(vb: VarBuilder, config: &Config, rotary: Arc<RotaryEmbedding>, index: usize) -> Result<Self> {
        // Layer 0 reads the already normalized embeddings and has no attention norm.
        let attn_norm = if index == 0 {
            None
        } else {
            Some(layer_norm_no_bias(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("attn_norm"),
            )?)
        };
        let local = index % config.global_attn_every_n_layers != 0;
        Ok(Self {
            attn_norm,
            attn: SelfAttention::load(vb.pp("attn"), config, rotary)?,
            mlp_norm: layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("mlp_norm"))?,
            mlp: GatedMlp::load(vb.pp("mlp"), config)?,
            local,
        })
    }

    fn forward(&self, xs: &Tensor, global_mask: &Tensor, local_mask: &Tensor) -> Result<Tensor> {
        let normed = match &self.attn_norm {
            Some(norm) => xs.apply(norm)?,
            None => xs.clone(),
        };
        let attn_out = if self.local {
            self.attn
                .forward(&normed, &global_mask.broadcast_add(local_mask)?)?
        } else {
            self.attn.forward(&normed, global_mask)?
        };
        let xs = (xs + attn_out)?;
        let mlp_out = xs.apply(&self.mlp_norm)?.apply(&self.mlp)?;
        xs + mlp_out
    }
}

#[derive(Debug, Clone)]
struct Encoder {
    embeddings: Embedding,
    embedding_norm: LayerNorm,
    layers: Vec<EncoderLayer>,
    final_norm: LayerNorm,
    window: usize,
    device: Device,
    dtype: DType,
}

impl Encoder {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let global_rotary = Arc::new(RotaryEmbedding::new(
            vb.dtype(),
            config,
            config.global_rope_theta,
            vb.device(),
        )?);
        let local_rotary = Arc::new(RotaryEmbedding::new(
            vb.dtype(),
            config,
            config.local_rope_theta,
            vb.device(),
        )?);

        let layers = (0..config.num_hidden_layers)
            .map(|i| {
                let local = i % config.global_attn_every_n_layers != 0;
                let rotary = if local {
                    local_rotary.clone()
                } else {
                    global_rotary.clone()
                };
                EncoderLayer::load(vb.pp(format!("model.layers.{i}")), config, rotary, i)
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            embeddings: embedding(
                config.vocab_size,
                config.hidden_size,
                vb.pp("model.embeddings.tok_embeddings"),
            )?,
            embedding_norm: layer_norm_no_bias(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("model.embeddings.norm"),
            )?,
            layers,
            final_norm: layer_norm_no_bias(
                config.hidden_size,
                config.layer_norm_eps,
                vb.pp("model.final_norm"),
            )?,
            window: config.local_attention,
            device: vb.device().clone(),
            dtype: vb.dtype(),
        })
    }

    /// Additive mask hiding padded key positions: (batch, 1, 1, seq).
    fn padding_mask(&self, attention_mask: &Tensor) -> Result<Tensor> {
        let (batch, seq_len) = attention_mask.dims2()?;
        let keep = attention_mask
            .to_dtype(self.dtype)?
            .reshape((batch, 1, 1, seq_len))?;
        ((1.0 - keep)? * MASK_MIN)?.to_dtype(self.dtype)
    }

    /// Additive mask limiting attention to `window / 2` positions either side: (seq, seq).
    fn window_mask(&self, seq_len: usize) -> Result<Tensor> {
        let reach = self.window / 2;
        let mask: Vec<f32> = (0..seq_len)
            .flat_map(|i| {
                (0..seq_len).map(move |j| if i.abs_diff(j) > reach { f32::NEG_INFINITY } else { 0.0 })
            })
            .collect();
        Tensor::from_slice(&mask, (seq_len, seq_len), &self.device)?.to_dtype(self.dtype)
    }

    fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let seq_len = input_ids.dim(1)?;
        let global_mask = self.padding_mask(attention_mask)?;
        let local_mask = self.window_mask(seq_len)?;

        let mut xs = input_ids.apply(&self.embeddings)?.apply(&self.embedding_norm)?;
        for layer in &self.layers {
            xs = layer.forward(&xs, &global_mask, &local_mask)?;
        }
        xs.apply(&self.final_norm)
    }
}

#[derive(Debug, Clone)]
struct ClassificationHead {
    dense: Linear,
    norm: LayerNorm,
    classifier: Linear,
    pooling: Pooling,
}

impl ClassificationHead {
    fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        Ok(Self {
            dense: linear_no_bias(config.hidden_size, config.hidden_size, vb.pp("head.dense"))?,
            norm: layer_norm_no_bias(config.hidden_size, config.layer_norm_eps, vb.pp("head.norm"))?,
            classifier: linear(config.hidden_size, config.num_labels(), vb.pp("classifier"))?,
            pooling: config.classifier_pooling,
        })
    }

    fn forward(&self, hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let pooled = match self.pooling {
            Pooling::Cls => hidden.i((.., 0, ..))?,
            Pooling::Mean => {
                let mask = attention_mask.to_dtype(hidden.dtype())?;
                let summed = hidden
                    .broadcast_mul(&mask.unsqueeze(D::Minus1)?)?
                    .sum(1)?;
                summed.broadcast_div(&mask.sum_keepdim(1)?)?
            }
        };
        pooled
            .apply(&self.dense)?
            .gelu_erf()?
            .apply(&self.norm)?
            .apply(&self.classifier)
    }
}

/// ModernBERT for sequence classification. Clones share the encoder weights.
#[derive(Debug, Clone)]
pub struct ModernBertForSequenceClassification {
    encoder: Arc<Encoder>,
    head: ClassificationHead,
}

impl ModernBertForSequenceClassification {
    pub fn load(vb: VarBuilder, config: &Config) -> Result<Self> {
        let encoder = Arc::new(Encoder::load(vb.clone(), config)?);
        let head = ClassificationHead::load(vb, config)?;
        Ok(Self { encoder, head })
    }

    /// `input_ids` and `attention_mask` are `(batch, seq)`; returns logits `(batch, num_labels)`.
    pub fn forward(&self, input_ids: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
        let hidden = self.encoder.forward(input_ids, attention_mask)?;
        self.head.forward(&hidden, attention_mask)
    }

    pub fn device(&self) -> &Device {
        &self.encoder.device
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_json(id2label: &str) -> String {
        format!(
            r#"{{
                "vocab_size": 50368, "hidden_size": 768, "num_hidden_layers": 22,
                "num_attention_heads": 12, "intermediate_size": 1152,
                "max_position_embeddings": 8192, "layer_norm_eps": 1e-5, "pad_token_id": 50283,
                "global_attn_every_n_layers": 3, "global_rope_theta": 160000.0,
                "local_attention": 128, "local_rope_theta": 10000.0,
                "classifier_pooling": "mean",
                "id2label": {id2label}
            }}"#
        )
    }

    #[test]
    fn labels_follow_class_index() {
        let config: Config =
            serde_json::from_str(&config_json(r#"{"2": "negative", "0": "positive", "1": "neutral"}"#))
                .unwrap();
        assert_eq!(config.num_labels(), 3);
        assert_eq!(config.classifier_pooling, Pooling::Mean);
        assert_eq!(config.labels().unwrap(), vec!["POSITIVE", "NEUTRAL", "NEGATIVE"]);
    }

    #[test]
    fn labels_reject_gaps() {
        let config: Config =
            serde_json::from_str(&config_json(r#"{"0": "positive", "2": "negative"}"#)).unwrap();
        assert!(config.labels().is_err());
    }

    #[test]
    fn pooling_defaults_to_mean() {
        let json = config_json(r#"{"0": "positive"}"#).replace(r#""classifier_pooling": "mean","#, "");
        let config: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(config.classifier_pooling, Pooling::Mean);
    }

    fn tiny_config() -> Config {
        Config {
            vocab_size: 16,
            hidden_size: 8,
            num_hidden_layers: 3,
            num_attention_heads: 2,
            intermediate_size: 16,
            max_position_embeddings: 32,
            layer_norm_eps: 1e-5,
            pad_token_id: 0,
            global_attn_every_n_layers: 3,
            global_rope_theta: 160000.0,
            local_attention: 4,
            local_rope_theta: 10000.0,
            id2label: HashMap::from([
                ("0".to_string(), "negative".to_string()),
                ("1".to_string(), "positive".to_string()),
            ]),
            classifier_pooling: Pooling::Mean,
        }
    }

    fn rotary(config: &Config) -> Arc<RotaryEmbedding> {
        Arc::new(RotaryEmbedding::new(DType::F32, config, 10000.0, &Device::Cpu).unwrap())
    }

    #[test]
    fn only_the_first_layer_skips_the_attention_norm() {
        let config = tiny_config();
        let vb = VarBuilder::zeros(DType::F32, &Device::Cpu);

        let first = EncoderLayer::load(vb.pp("model.layers.0"), &config, rotary(&config), 0).unwrap();
        let second = EncoderLayer::load(vb.pp("model.layers.1"), &config, rotary(&config), 1).unwrap();
        assert!(first.attn_norm.is_none());
        assert!(!first.local);
        assert!(second.attn_norm.is_some());
        assert!(second.local);
    }

    #[test]
    fn missing_attention_norm_is_an_error() {
        let config = tiny_config();
        let vb = VarBuilder::from_tensors(HashMap::new(), DType::F32, &Device::Cpu);
        assert!(EncoderLayer::load(vb.pp("model.layers.1"), &config, rotary(&config), 1).is_err());
    }

    #[test]
    fn forward_yields_one_row_of_logits_per_text() {
        let config = tiny_config();
        let model =
            ModernBertForSequenceClassification::load(VarBuilder::zeros(DType::F32, &Device::Cpu), &config)
                .unwrap();
        let input_ids = Tensor::new(&[[1u32, 2, 3, 4, 5], [6, 7, 0, 0, 0]], &Device::Cpu).unwrap();
        let attention_mask = Tensor::new(&[[1u32, 1, 1, 1, 1], [1, 1, 0, 0, 0]], &Device::Cpu).unwrap();

        let logits = model.forward(&input_ids, &attention_mask).unwrap();
        assert_eq!(logits.dims(), &[2, config.num_labels()]);
    }
}
