use crate::corpus::ColumnOrder;
use crate::translation::language::LanguagePair;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_INDEX_PATH: &str = "./translation_index";
const DEFAULT_QDRANT_URL: &str = "http://127.0.0.1:6333";
const DEFAULT_QDRANT_COLLECTION: &str = "translation-pairs";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_DATASET: &str = "seymasa/turkish-to-english-translation-dataset";
const DEFAULT_CORPUS_FILE: &str = "TR2EN.txt";
const DEFAULT_DOWNLOAD_URL: &str = "https://www.kaggle.com/api/v1/datasets/download";

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration shared by the ingestion and query pipelines.
#[derive(Debug, Clone)]
pub struct Config {
    /// Embedding provider used to generate vector representations.
    pub embedding_provider: EmbeddingProvider,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Dimensionality of the produced vectors.
    pub embedding_dimension: usize,
    /// Maximum number of texts sent per embedding request.
    pub embedding_batch_size: usize,
    /// Chat-completion provider used for query rewriting and translation.
    pub generation_provider: GenerationProvider,
    /// Generation model identifier passed to the provider.
    pub generation_model: String,
    /// Sampling temperature for the final translation call.
    pub generation_temperature: f32,
    /// Sampling temperature for the retrieval query rewrite call.
    pub rewrite_temperature: f32,
    /// Credentials and endpoints for the hosted providers.
    pub providers: ProviderEndpoints,
    /// Storage backend holding the translation index.
    pub vector_backend: VectorBackend,
    /// Filesystem location of the local index.
    pub index_path: PathBuf,
    /// Base URL of the Qdrant instance when the Qdrant backend is selected.
    pub qdrant_url: String,
    /// Name of the Qdrant collection used for the translation index.
    pub qdrant_collection_name: String,
    /// Optional API key required to access Qdrant.
    pub qdrant_api_key: Option<String>,
    /// Number of reference chunks retrieved per query.
    pub retrieval_top_k: usize,
    /// Maximum chunk length in characters.
    pub chunk_size: usize,
    /// Maximum overlap between adjacent chunks in characters.
    pub chunk_overlap: usize,
    /// Whether tokens longer than `chunk_size` are split at character boundaries.
    pub chunk_split_oversized: bool,
    /// Corpus location and parsing options.
    pub corpus: CorpusConfig,
    /// Source/target language names and the source-language character set.
    pub languages: LanguagePair,
    /// Optional path to a custom translation prompt template.
    pub prompt_template_path: Option<PathBuf>,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Endpoints and API credentials for hosted embedding and generation services.
#[derive(Clone, Default)]
pub struct ProviderEndpoints {
    /// API key for Google Gemini.
    pub gemini_api_key: Option<String>,
    /// Base URL for the Gemini REST API.
    pub gemini_base_url: String,
    /// API key for OpenAI-compatible endpoints.
    pub openai_api_key: Option<String>,
    /// Base URL for OpenAI-compatible endpoints.
    pub openai_base_url: String,
    /// Base URL of the local Ollama runtime.
    pub ollama_url: String,
}

impl std::fmt::Debug for ProviderEndpoints {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderEndpoints")
            .field("has_gemini_api_key", &self.gemini_api_key.is_some())
            .field("gemini_base_url", &self.gemini_base_url)
            .field("has_openai_api_key", &self.openai_api_key.is_some())
            .field("openai_base_url", &self.openai_base_url)
            .field("ollama_url", &self.ollama_url)
            .finish()
    }
}

/// Where the bilingual corpus comes from and how its lines are laid out.
#[derive(Debug, Clone)]
pub struct CorpusConfig {
    /// Remote dataset identifier in `owner/dataset` form.
    pub dataset: String,
    /// Name of the tab-separated file inside the dataset directory.
    pub file_name: String,
    /// Local directory that replaces the remote download entirely.
    pub dir_override: Option<PathBuf>,
    /// Which column holds the target-language sentence.
    pub column_order: ColumnOrder,
    /// Cap on the number of pairs indexed; `0` disables the cap.
    pub max_pairs: usize,
    /// Base URL of the dataset download endpoint.
    pub download_url: String,
    /// Upper bound on the corpus download.
    pub download_timeout: Duration,
    /// Optional Kaggle username used for basic auth.
    pub kaggle_username: Option<String>,
    /// Optional Kaggle API key used for basic auth.
    pub kaggle_key: Option<String>,
}

/// Supported embedding backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmbeddingProvider {
    /// Google Gemini embeddings API.
    Gemini,
    /// Hosted OpenAI-compatible embeddings API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
    /// Deterministic offline byte-hash embeddings.
    Hashed,
}

/// Supported chat-completion backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GenerationProvider {
    /// Google Gemini `generateContent` API.
    Gemini,
    /// Hosted OpenAI-compatible chat completions API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

/// Storage backend for the translation index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VectorBackend {
    /// File-backed index stored under `INDEX_PATH`.
    Local,
    /// Remote Qdrant collection.
    Qdrant,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let embedding_provider = vars.parse_or("EMBEDDING_PROVIDER", EmbeddingProvider::Gemini)?;
        let generation_provider =
            vars.parse_or("GENERATION_PROVIDER", GenerationProvider::Gemini)?;
        let embedding_model = vars
            .optional("EMBEDDING_MODEL")
            .unwrap_or_else(|| embedding_provider.default_model().to_string());
        let embedding_dimension = vars.parse_or(
            "EMBEDDING_DIMENSION",
            embedding_provider.default_dimension(),
        )?;
        if embedding_dimension == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_DIMENSION".into()));
        }
        let embedding_batch_size = vars.parse_or("EMBEDDING_BATCH_SIZE", 100_usize)?.max(1);

        let providers = ProviderEndpoints {
            gemini_api_key: vars.optional("GEMINI_API_KEY"),
            gemini_base_url: vars
                .optional("GEMINI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string()),
            openai_api_key: vars.optional("OPENAI_API_KEY"),
            openai_base_url: vars
                .optional("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            ollama_url: vars
                .optional("OLLAMA_URL")
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
        };

        let needs_gemini = embedding_provider == EmbeddingProvider::Gemini
            || generation_provider == GenerationProvider::Gemini;
        if needs_gemini && providers.gemini_api_key.is_none() {
            return Err(ConfigError::MissingVariable("GEMINI_API_KEY".into()));
        }
        let needs_openai = embedding_provider == EmbeddingProvider::OpenAI
            || generation_provider == GenerationProvider::OpenAI;
        if needs_openai && providers.openai_api_key.is_none() {
            return Err(ConfigError::MissingVariable("OPENAI_API_KEY".into()));
        }

        let chunk_size = vars.parse_or("CHUNK_SIZE", 800_usize)?;
        let chunk_overlap = vars.parse_or("CHUNK_OVERLAP", 150_usize)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue("CHUNK_SIZE".into()));
        }
        if chunk_overlap >= chunk_size {
            return Err(ConfigError::InvalidValue("CHUNK_OVERLAP".into()));
        }

        let retrieval_top_k = vars.parse_or("RETRIEVAL_TOP_K", 5_usize)?;
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".into()));
        }

        let generation_model = vars
            .optional("GENERATION_MODEL")
            .unwrap_or_else(|| generation_provider.default_model().to_string());

        let corpus = CorpusConfig {
            dataset: vars
                .optional("CORPUS_DATASET")
                .unwrap_or_else(|| DEFAULT_DATASET.to_string()),
            file_name: vars
                .optional("CORPUS_FILE")
                .unwrap_or_else(|| DEFAULT_CORPUS_FILE.to_string()),
            dir_override: vars.optional("CORPUS_DIR").map(PathBuf::from),
            column_order: vars.parse_or("CORPUS_COLUMN_ORDER", ColumnOrder::TargetFirst)?,
            max_pairs: vars.parse_or("CORPUS_MAX_PAIRS", 1000_usize)?,
            download_url: vars
                .optional("CORPUS_DOWNLOAD_URL")
                .unwrap_or_else(|| DEFAULT_DOWNLOAD_URL.to_string()),
            download_timeout: Duration::from_secs(
                vars.parse_or("CORPUS_DOWNLOAD_TIMEOUT_SECS", 300_u64)?,
            ),
            kaggle_username: vars.optional("KAGGLE_USERNAME"),
            kaggle_key: vars.optional("KAGGLE_KEY"),
        };

        let defaults = LanguagePair::default();
        let languages = LanguagePair {
            source_name: vars
                .optional("SOURCE_LANGUAGE")
                .unwrap_or(defaults.source_name),
            target_name: vars
                .optional("TARGET_LANGUAGE")
                .unwrap_or(defaults.target_name),
            source_charset: vars
                .optional("SOURCE_CHARSET")
                .unwrap_or(defaults.source_charset),
        };

        Ok(Self {
            embedding_provider,
            embedding_model,
            embedding_dimension,
            embedding_batch_size,
            generation_provider,
            generation_model,
            generation_temperature: vars.parse_or("GENERATION_TEMPERATURE", 0.3_f32)?,
            rewrite_temperature: vars.parse_or("REWRITE_TEMPERATURE", 0.2_f32)?,
            providers,
            vector_backend: vars.parse_or("VECTOR_BACKEND", VectorBackend::Local)?,
            index_path: vars
                .optional("INDEX_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX_PATH)),
            qdrant_url: vars
                .optional("QDRANT_URL")
                .unwrap_or_else(|| DEFAULT_QDRANT_URL.to_string()),
            qdrant_collection_name: vars
                .optional("QDRANT_COLLECTION_NAME")
                .unwrap_or_else(|| DEFAULT_QDRANT_COLLECTION.to_string()),
            qdrant_api_key: vars.optional("QDRANT_API_KEY"),
            retrieval_top_k,
            chunk_size,
            chunk_overlap,
            chunk_split_oversized: vars.parse_or("CHUNK_SPLIT_OVERSIZED", false)?,
            corpus,
            languages,
            prompt_template_path: vars.optional("PROMPT_TEMPLATE_PATH").map(PathBuf::from),
            server_port: vars
                .optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
        })
    }
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn parse_or<T: FromStr>(&self, key: &str, default: T) -> Result<T, ConfigError> {
        match self.optional(key) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string())),
            None => Ok(default),
        }
    }
}

impl EmbeddingProvider {
    /// Model used when `EMBEDDING_MODEL` is unset.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "text-embedding-004",
            Self::OpenAI => "text-embedding-3-small",
            Self::Ollama => "nomic-embed-text",
            Self::Hashed => "byte-hash",
        }
    }

    /// Vector size used when `EMBEDDING_DIMENSION` is unset.
    pub fn default_dimension(self) -> usize {
        match self {
            Self::Gemini | Self::Ollama => 768,
            Self::OpenAI => 1536,
            Self::Hashed => 256,
        }
    }

    /// Stable lowercase name recorded in index manifests.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gemini => "gemini",
            Self::OpenAI => "openai",
            Self::Ollama => "ollama",
            Self::Hashed => "hashed",
        }
    }
}

impl GenerationProvider {
    /// Model used when `GENERATION_MODEL` is unset.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-2.5-flash",
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "llama3.1",
        }
    }
}

impl FromStr for EmbeddingProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            "hashed" => Ok(Self::Hashed),
            _ => Err(()),
        }
    }
}

impl FromStr for GenerationProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

impl FromStr for VectorBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "file" => Ok(Self::Local),
            "qdrant" => Ok(Self::Qdrant),
            _ => Err(()),
        }
    }
}

/// Load `.env` (if present) and read the configuration from the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        embedding_provider = ?config.embedding_provider,
        embedding_model = %config.embedding_model,
        generation_provider = ?config.generation_provider,
        generation_model = %config.generation_model,
        vector_backend = ?config.vector_backend,
        index_path = %config.index_path.display(),
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(config)
}
