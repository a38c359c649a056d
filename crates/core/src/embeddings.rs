use crate::error::EmbedError;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

pub const DEFAULT_EMBEDDING_DIMENSIONS: usize = 384;
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-mpnet-base-v2";

/// Environment variable naming an HTTP embedding endpoint. When set, the
/// pipeline embeds through it instead of the built-in local model.
pub const EMBED_ENDPOINT_ENV: &str = "LEXRAG_EMBED_ENDPOINT";
pub const EMBED_API_KEY_ENV: &str = "LEXRAG_EMBED_API_KEY";

/// Identity and shape of the embedding space. The index records this at
/// build time; queries must use the same configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub dimensions: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_EMBEDDING_MODEL.to_string(),
            dimensions: DEFAULT_EMBEDDING_DIMENSIONS,
        }
    }
}

impl EmbeddingConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }
}

/// The pipeline's embedding capability. Output vectors are L2-normalized,
/// so cosine similarity between them reduces to a dot product.
pub trait Embedder {
    fn config(&self) -> &EmbeddingConfig;
    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError>;

    fn dimensions(&self) -> usize {
        self.config().dimensions
    }
}

/// Local deterministic sentence embedder: character trigrams are FNV-hashed
/// into a fixed number of buckets and the resulting count vector is
/// L2-normalized. No model download, no I/O; identical text always embeds
/// to an identical vector.
#[derive(Debug, Clone)]
pub struct HashedNgramEmbedder {
    config: EmbeddingConfig,
}

impl HashedNgramEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self { config }
    }
}

impl Default for HashedNgramEmbedder {
    fn default() -> Self {
        Self::new(EmbeddingConfig::default())
    }
}

impl Embedder for HashedNgramEmbedder {
    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let mut vector = vec![0f32; self.config.dimensions.max(1)];
        let lowered = text.to_lowercase();
        let chars: Vec<char> = lowered.chars().collect();

        if chars.is_empty() {
            return Ok(vector);
        }

        for window in chars.windows(3) {
            let mut hash = 1469598103934665603u64;
            for c in window {
                let mut buffer = [0u8; 4];
                for byte in c.encode_utf8(&mut buffer).bytes() {
                    hash ^= byte as u64;
                    hash = hash.wrapping_mul(1099511628211);
                }
            }
            let bucket = (hash % vector.len() as u64) as usize;
            vector[bucket] += 1.0;
        }

        normalize(&mut vector);
        Ok(vector)
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

/// Remote embedding backend: posts `{model, input}` to an HTTP endpoint
/// that answers `{embedding: [..]}`. Response vectors are normalized here
/// so the index never depends on the backend doing it.
pub struct HttpEmbedder {
    endpoint: Url,
    api_key: Option<String>,
    config: EmbeddingConfig,
    client: Client,
}

impl HttpEmbedder {
    pub fn new(
        endpoint: &str,
        api_key: Option<String>,
        config: EmbeddingConfig,
    ) -> Result<Self, EmbedError> {
        Ok(Self {
            endpoint: Url::parse(endpoint)?,
            api_key,
            config,
            client: Client::new(),
        })
    }

    /// Build from `LEXRAG_EMBED_ENDPOINT` / `LEXRAG_EMBED_API_KEY`.
    /// Returns `None` when no endpoint is configured.
    pub fn from_env(config: EmbeddingConfig) -> Result<Option<Self>, EmbedError> {
        let endpoint = match std::env::var(EMBED_ENDPOINT_ENV) {
            Ok(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => return Ok(None),
        };

        let api_key = std::env::var(EMBED_API_KEY_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());

        Ok(Some(Self::new(&endpoint, api_key, config)?))
    }
}

impl Embedder for HttpEmbedder {
    fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedError> {
        let payload = EmbeddingRequest {
            model: &self.config.model,
            input: text,
        };

        let mut request = self.client.post(self.endpoint.clone()).json(&payload);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send()?;
        if !response.status().is_success() {
            return Err(EmbedError::Backend {
                status: response.status().to_string(),
                details: self.endpoint.to_string(),
            });
        }

        let parsed: EmbeddingResponse = response.json()?;
        check_dimensions(parsed.embedding, self.config.dimensions)
    }
}

/// Select the embedding backend: the HTTP endpoint when one is configured
/// in the environment, the local hashed-n-gram model otherwise.
pub fn embedder_from_env(config: EmbeddingConfig) -> Result<Box<dyn Embedder>, EmbedError> {
    match HttpEmbedder::from_env(config.clone())? {
        Some(remote) => Ok(Box::new(remote)),
        None => Ok(Box::new(HashedNgramEmbedder::new(config))),
    }
}

fn check_dimensions(mut vector: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbedError> {
    if vector.len() != expected {
        return Err(EmbedError::Dimensions {
            expected,
            actual: vector.len(),
        });
    }
    normalize(&mut vector);
    Ok(vector)
}

fn normalize(vector: &mut [f32]) {
    let magnitude = vector.iter().map(|value| value * value).sum::<f32>().sqrt();
    if magnitude > 0.0 {
        for value in vector.iter_mut() {
            *value /= magnitude;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedder_is_deterministic() {
        let embedder = HashedNgramEmbedder::default();
        let first = embedder.embed("fundamental rights and duties").unwrap();
        let second = embedder.embed("fundamental rights and duties").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn embedder_outputs_configured_length() {
        let embedder = HashedNgramEmbedder::new(EmbeddingConfig {
            model: "test-model".to_string(),
            dimensions: 32,
        });
        let vector = embedder.embed("abc def").unwrap();
        assert_eq!(vector.len(), 32);
    }

    #[test]
    fn vectors_are_unit_length() {
        let embedder = HashedNgramEmbedder::default();
        let vector = embedder.embed("directive principles of state policy").unwrap();
        let magnitude = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((magnitude - 1.0).abs() < 1e-4);
    }

    #[test]
    fn empty_text_embeds_to_the_zero_vector() {
        let embedder = HashedNgramEmbedder::default();
        let vector = embedder.embed("").unwrap();
        assert!(vector.iter().all(|value| *value == 0.0));
    }

    #[test]
    fn similar_text_scores_higher_than_unrelated_text() {
        let embedder = HashedNgramEmbedder::default();
        let query = embedder.embed("freedom of speech and expression").unwrap();
        let related = embedder.embed("the freedom of speech shall not be restricted").unwrap();
        let unrelated = embedder.embed("zxqj vvkw pplm").unwrap();

        let close: f32 = query.iter().zip(&related).map(|(a, b)| a * b).sum();
        let far: f32 = query.iter().zip(&unrelated).map(|(a, b)| a * b).sum();
        assert!(close > far);
    }

    #[test]
    fn response_dimension_mismatch_is_rejected() {
        let result = check_dimensions(vec![0.1, 0.2], 3);
        assert!(matches!(
            result,
            Err(EmbedError::Dimensions { expected: 3, actual: 2 })
        ));
    }

    #[test]
    fn response_vectors_are_normalized() {
        let vector = check_dimensions(vec![3.0, 4.0], 2).unwrap();
        assert!((vector[0] - 0.6).abs() < 1e-6);
        assert!((vector[1] - 0.8).abs() < 1e-6);
    }
}
