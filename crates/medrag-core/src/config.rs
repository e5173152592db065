//! Lightweight configuration loader, typed settings and path helpers.
//!
//! Uses Figment to merge `config.toml` + `config.<env>.toml` + `APP_*` env vars
//! (nested keys separated by `__`, e.g. `APP_RETRIEVAL__K=5`). Relative paths
//! in the `data` section resolve against the directory holding the config files.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::Error;

pub struct Config {
    figment: Figment,
    base_dir: PathBuf,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(Path::new("."))
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base_dir: dir.to_path_buf() };
        config.validate_for_env(&env_name)?;
        Ok(config)
    }

    /// Build a config from an inline TOML document; relative paths resolve against `base_dir`.
    pub fn from_toml_str(toml: &str, base_dir: &Path) -> Self {
        Self { figment: Figment::new().merge(Toml::string(toml)), base_dir: base_dir.to_path_buf() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Extract the typed settings, resolve data paths and validate them.
    pub fn settings(&self) -> anyhow::Result<Settings> {
        let mut settings: Settings = self
            .figment
            .extract()
            .map_err(|e| anyhow::anyhow!("Failed to parse settings: {}", e))?;
        settings.data = settings.data.resolved(&self.base_dir);
        if let Some(dir) = settings.embedding.model_dir.take() {
            settings.embedding.model_dir = Some(resolve_with_base(&self.base_dir, dir.to_string_lossy()));
        }
        settings.validate()?;
        Ok(settings)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn validate_for_env(&self, env: &str) -> anyhow::Result<()> {
        match env {
            "prod" | "production" => {
                let fake: bool = self.get("embedding.fake").unwrap_or(false);
                if fake {
                    return Err(anyhow::anyhow!("Prod config must not use fake embeddings"));
                }
            }
            "dev" | "development" | "test" | "testing" => {}
            _ => {}
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub chunking: ChunkingSettings,
    pub embedding: EmbeddingSettings,
    pub retrieval: RetrievalSettings,
    pub generation: GenerationSettings,
    pub nutrition: NutritionSettings,
}

impl Settings {
    pub fn validate(&self) -> Result<(), Error> {
        if self.retrieval.k == 0 {
            return Err(Error::InvalidConfig("retrieval.k must be at least 1".into()));
        }
        if self.chunking.chunk_size == 0 {
            return Err(Error::InvalidConfig("chunking.chunk_size must be at least 1".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::InvalidConfig(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if !(0.0..=2.0).contains(&self.generation.temperature) {
            return Err(Error::InvalidConfig(format!(
                "generation.temperature {} is outside [0, 2]",
                self.generation.temperature
            )));
        }
        if self.embedding.batch_size == 0 {
            return Err(Error::InvalidConfig("embedding.batch_size must be at least 1".into()));
        }
        Ok(())
    }
}

/// Corpus sources and index location.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub article_csvs: Vec<PathBuf>,
    pub qa_csvs: Vec<PathBuf>,
    pub pdf_articles: Vec<PathBuf>,
    pub pdf_qa: Vec<PathBuf>,
    /// Optional directory scanned recursively for `*.csv` and `*.pdf` files.
    pub corpus_dir: Option<PathBuf>,
    pub index_dir: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            article_csvs: vec![PathBuf::from("cleaned_data/merged_article2s_cleaned.csv")],
            qa_csvs: vec![PathBuf::from("cleaned_data/taiwan_ehospital_diabetes_qa_cleaned.csv")],
            pdf_articles: vec![PathBuf::from("docs/diabetic_acticles.pdf")],
            pdf_qa: vec![PathBuf::from("docs/diabetic_qa.pdf")],
            corpus_dir: None,
            index_dir: PathBuf::from("vector_DB/diabetic_vector_db"),
        }
    }
}

impl DataSettings {
    fn resolved(self, base: &Path) -> Self {
        let fix = |paths: Vec<PathBuf>| -> Vec<PathBuf> {
            paths.into_iter().map(|p| resolve_with_base(base, p.to_string_lossy())).collect()
        };
        Self {
            article_csvs: fix(self.article_csvs),
            qa_csvs: fix(self.qa_csvs),
            pdf_articles: fix(self.pdf_articles),
            pdf_qa: fix(self.pdf_qa),
            corpus_dir: self.corpus_dir.map(|p| resolve_with_base(base, p.to_string_lossy())),
            index_dir: resolve_with_base(base, self.index_dir.to_string_lossy()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Characters repeated between consecutive chunks.
    pub chunk_overlap: usize,
    /// Break points in priority order.
    pub separators: Vec<String>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 150,
            separators: vec!["\u{3002}".into(), "\u{ff0c}".into(), "\n".into()],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub model_name: String,
    pub model_dir: Option<PathBuf>,
    /// `cpu`, `metal` or `cuda`; unavailable accelerators fall back to CPU.
    pub device: String,
    /// Token cap per text, special tokens included. Chinese text runs about one
    /// token per character, so a full 400-character chunk is embedded from its
    /// first ~254 characters only.
    pub max_len: usize,
    pub batch_size: usize,
    pub fake: bool,
    pub fake_dim: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model_name: "DMetaSoul/sbert-chinese-general-v2".into(),
            model_dir: None,
            device: "cpu".into(),
            max_len: 256,
            batch_size: 32,
            fake: false,
            fake_dim: 768,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalSettings {
    pub k: usize,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self { k: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub response_mime_type: String,
    pub safety_threshold: String,
    /// Reply length cap stated in the prompt, in characters.
    pub max_chars: usize,
    pub language: String,
    /// Returned to the user whenever the model call fails or yields no text.
    pub fallback_message: String,
    /// What the model is told to answer when the context is insufficient.
    pub refusal_message: String,
    pub timeout_secs: u64,
    pub batch_pause_ms: u64,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            model: "gemini-1.5-flash".into(),
            api_key: None,
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            temperature: 0.3,
            max_output_tokens: 512,
            response_mime_type: "text/plain".into(),
            safety_threshold: "BLOCK_NONE".into(),
            max_chars: 60,
            language: "繁體中文".into(),
            fallback_message: "不好意思，我不清楚。".into(),
            refusal_message: "這個問題需要更多專業資訊才能完整回答，建議您諮詢主治醫師".into(),
            timeout_secs: 60,
            batch_pause_ms: 2000,
        }
    }
}

impl GenerationSettings {
    /// Configured key, else `GOOGLE_API_KEY` from the environment.
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var("GOOGLE_API_KEY").ok().filter(|k| !k.trim().is_empty()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NutritionSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub token_url: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for NutritionSettings {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            token_url: "https://oauth.fatsecret.com/connect/token".into(),
            api_url: "https://platform.fatsecret.com/rest/server.api".into(),
            timeout_secs: 30,
        }
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
