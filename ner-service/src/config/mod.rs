use crate::services::pipeline::umls::UmlsPipelineConfig;
use serde::Deserialize;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct NerConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub model: ModelConfig,
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// JSON-lines UMLS concept file
    pub knowledge_base_path: PathBuf,
    pub linker_threshold: f32,
    pub max_entities_per_mention: usize,
    pub resolve_abbreviations: bool,
    pub max_mention_tokens: usize,
    /// Load the pipeline at startup instead of on the first request
    pub preload: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    /// `*` allows any origin
    pub cors_allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
}

impl NerConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let is_prod = env::var("ENVIRONMENT").unwrap_or_else(|_| "dev".to_string()) == "prod";

        let config = NerConfig {
            common: common_config,
            model: ModelConfig {
                knowledge_base_path: PathBuf::from(get_env(
                    "NER_KB_PATH",
                    Some("data/umls_sample.jsonl"),
                    is_prod,
                )?),
                linker_threshold: parse_env("NER_LINKER_THRESHOLD", "0.7")?,
                max_entities_per_mention: parse_env("NER_MAX_ENTITIES_PER_MENTION", "5")?,
                resolve_abbreviations: parse_env("NER_RESOLVE_ABBREVIATIONS", "true")?,
                max_mention_tokens: parse_env("NER_MAX_MENTION_TOKENS", "6")?,
                preload: parse_env("NER_PRELOAD_MODEL", "true")?,
            },
            http: HttpConfig {
                cors_allowed_origins: get_env("CORS_ALLOWED_ORIGINS", Some("*"), false)?
                    .split(',')
                    .map(|origin| origin.trim().to_string())
                    .filter(|origin| !origin.is_empty())
                    .collect(),
                max_body_bytes: parse_env(
                    "NER_MAX_BODY_BYTES",
                    &DEFAULT_MAX_BODY_BYTES.to_string(),
                )?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), AppError> {
        if !(0.0..=1.0).contains(&self.model.linker_threshold) {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NER_LINKER_THRESHOLD must be between 0 and 1, got {}",
                self.model.linker_threshold
            )));
        }
        if self.model.max_mention_tokens == 0 {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "NER_MAX_MENTION_TOKENS must be at least 1"
            )));
        }
        Ok(())
    }

    pub fn pipeline_config(&self) -> UmlsPipelineConfig {
        UmlsPipelineConfig {
            knowledge_base_path: self.model.knowledge_base_path.clone(),
            linker_threshold: self.model.linker_threshold,
            max_entities_per_mention: self.model.max_entities_per_mention,
            resolve_abbreviations: self.model.resolve_abbreviations,
            max_mention_tokens: self.model.max_mention_tokens,
        }
    }
}

impl Default for NerConfig {
    fn default() -> Self {
        let pipeline = UmlsPipelineConfig::default();
        Self {
            common: core_config::Config::default(),
            model: ModelConfig {
                knowledge_base_path: pipeline.knowledge_base_path,
                linker_threshold: pipeline.linker_threshold,
                max_entities_per_mention: pipeline.max_entities_per_mention,
                resolve_abbreviations: pipeline.resolve_abbreviations,
                max_mention_tokens: pipeline.max_mention_tokens,
                preload: true,
            },
            http: HttpConfig {
                cors_allowed_origins: vec!["*".to_string()],
                max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            },
        }
    }
}

fn get_env(key: &str, default: Option<&str>, is_prod: bool) -> Result<String, AppError> {
    match env::var(key) {
        Ok(val) => Ok(val),
        Err(_) => {
            if is_prod {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required in production but not set",
                    key
                )))
            } else if let Some(def) = default {
                Ok(def.to_string())
            } else {
                Err(AppError::ConfigError(anyhow::anyhow!(
                    "{} is required but not set",
                    key
                )))
            }
        }
    }
}

/// Tunables always fall back to their default, even in production.
fn parse_env<T>(key: &str, default: &str) -> Result<T, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = get_env(key, Some(default), false)?;
    raw.trim().parse().map_err(|e: T::Err| {
        AppError::ConfigError(anyhow::anyhow!("Invalid value {:?} for {}: {}", raw, key, e))
    })
}
