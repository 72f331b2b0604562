use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub embedding: EmbeddingConfig,
    #[serde(default)]
    pub chunking: ChunkingConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub generation: Option<GenerationConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `openai`, `ollama`, or `stub` (deterministic, offline).
    pub provider: String,
    #[serde(default)]
    pub model: Option<String>,
    /// Vector dimensionality. All writes and queries against one store
    /// must use the same value.
    pub dims: usize,
    /// Base URL override (Ollama; ignored by the OpenAI provider).
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_embed_retries")]
    pub max_retries: u32,
    #[serde(default = "default_embed_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_embed_retries() -> u32 {
    5
}
fn default_embed_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChunkingConfig {
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
        }
    }
}

fn default_max_chars() -> usize {
    1000
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestConfig {
    /// Records buffered before each bulk write.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Concurrent in-flight embedding tasks.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
        }
    }
}

fn default_batch_size() -> usize {
    50
}
fn default_max_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct RetrievalConfig {
    /// Nearest chunks fetched per query.
    #[serde(default = "default_k")]
    pub k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { k: default_k() }
    }
}

fn default_k() -> usize {
    3
}

#[derive(Debug, Deserialize, Clone)]
pub struct HistoryConfig {
    /// Most recent turns merged into the assembled context.
    #[serde(default = "default_window")]
    pub window: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            window: default_window(),
        }
    }
}

fn default_window() -> usize {
    10
}

#[derive(Debug, Deserialize, Clone)]
pub struct GenerationConfig {
    /// Full chat-completions endpoint URL.
    pub url: String,
    pub model: String,
    #[serde(default = "default_gen_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
}

fn default_gen_timeout_secs() -> u64 {
    60
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.2
}
fn default_top_p() -> f32 {
    0.9
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    if config.chunking.max_chars == 0 {
        anyhow::bail!("chunking.max_chars must be > 0");
    }

    if config.ingest.batch_size == 0 {
        anyhow::bail!("ingest.batch_size must be > 0");
    }
    if config.ingest.max_workers == 0 {
        anyhow::bail!("ingest.max_workers must be > 0");
    }

    if config.retrieval.k == 0 {
        anyhow::bail!("retrieval.k must be >= 1");
    }

    if config.embedding.dims == 0 {
        anyhow::bail!("embedding.dims must be > 0");
    }

    match config.embedding.provider.as_str() {
        "openai" | "ollama" | "stub" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be openai, ollama, or stub.",
            other
        ),
    }

    if config.embedding.provider != "stub" && config.embedding.model.is_none() {
        anyhow::bail!(
            "embedding.model must be specified for provider '{}'",
            config.embedding.provider
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[test]
    fn minimal_config_gets_defaults() {
        let file = write_config(
            r#"
[db]
path = "/tmp/ragmill.sqlite"

[embedding]
provider = "stub"
dims = 8
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        assert_eq!(cfg.chunking.max_chars, 1000);
        assert_eq!(cfg.ingest.batch_size, 50);
        assert_eq!(cfg.ingest.max_workers, 4);
        assert_eq!(cfg.retrieval.k, 3);
        assert_eq!(cfg.history.window, 10);
        assert!(cfg.generation.is_none());
    }

    #[test]
    fn generation_defaults() {
        let file = write_config(
            r#"
[db]
path = "/tmp/ragmill.sqlite"

[embedding]
provider = "stub"
dims = 8

[generation]
url = "http://127.0.0.1:1234/v1/chat/completions"
model = "test-model"
"#,
        );
        let cfg = load_config(file.path()).unwrap();
        let generation = cfg.generation.unwrap();
        assert_eq!(generation.timeout_secs, 60);
        assert_eq!(generation.max_tokens, 512);
        assert!((generation.temperature - 0.2).abs() < f32::EPSILON);
        assert!((generation.top_p - 0.9).abs() < f32::EPSILON);
    }

    #[test]
    fn rejects_unknown_provider() {
        let file = write_config(
            r#"
[db]
path = "/tmp/ragmill.sqlite"

[embedding]
provider = "cloudmagic"
dims = 384
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn rejects_zero_dims() {
        let file = write_config(
            r#"
[db]
path = "/tmp/ragmill.sqlite"

[embedding]
provider = "stub"
dims = 0
"#,
        );
        assert!(load_config(file.path()).is_err());
    }

    #[test]
    fn non_stub_provider_requires_model() {
        let file = write_config(
            r#"
[db]
path = "/tmp/ragmill.sqlite"

[embedding]
provider = "ollama"
dims = 768
"#,
        );
        assert!(load_config(file.path()).is_err());
    }
}
