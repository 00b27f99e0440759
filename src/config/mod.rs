use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::transcribe::deepgram::DEFAULT_LISTEN_URL;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcription vendor settings
    pub deepgram: DeepgramConfig,

    /// Database settings
    pub supabase: SupabaseConfig,

    /// Application settings
    pub app: AppConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeepgramConfig {
    /// API key; the `DEEPGRAM_API_KEY` environment variable overrides this
    #[serde(default)]
    pub api_key: String,

    /// Pre-recorded listen endpoint
    #[serde(default = "default_listen_url")]
    pub listen_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SupabaseConfig {
    /// Project base URL; the `SUPABASE_URL` environment variable overrides this
    #[serde(default)]
    pub url: String,

    /// Anon key; the `SUPABASE_ANON_KEY` environment variable overrides this
    #[serde(default)]
    pub anon_key: String,

    /// Table receiving transcription rows
    #[serde(default = "default_table")]
    pub table: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Scratch directory for downloaded audio (system temp dir if unset)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// HTTP server bind address
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_listen_url() -> String {
    DEFAULT_LISTEN_URL.to_string()
}

fn default_table() -> String {
    "transcriptions".to_string()
}

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deepgram: DeepgramConfig {
                api_key: String::new(),
                listen_url: default_listen_url(),
            },
            supabase: SupabaseConfig {
                url: String::new(),
                anon_key: String::new(),
                table: default_table(),
            },
            app: AppConfig {
                temp_dir: None,
                bind: default_bind(),
            },
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        let mut config = if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            serde_yaml::from_str::<Config>(&content).context("Failed to parse config file")?
        } else {
            let config = Self::default();
            config.save().await?;
            config
        };

        config.apply_env();
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(&config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("deeptube").join("config.yaml"))
    }

    /// Secrets come from the environment when present.
    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("DEEPGRAM_API_KEY") {
            self.deepgram.api_key = key;
        }
        if let Ok(url) = std::env::var("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Ok(key) = std::env::var("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.deepgram.api_key.is_empty() {
            anyhow::bail!("Deepgram API key must be configured (DEEPGRAM_API_KEY)");
        }

        if self.supabase.url.is_empty() {
            anyhow::bail!("Supabase URL must be configured (SUPABASE_URL)");
        }

        if self.supabase.anon_key.is_empty() {
            anyhow::bail!("Supabase anon key must be configured (SUPABASE_ANON_KEY)");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen endpoint: {}", self.deepgram.listen_url);
        println!("  Deepgram key: {}", redact(&self.deepgram.api_key));
        println!("  Supabase URL: {}", self.supabase.url);
        println!("  Supabase key: {}", redact(&self.supabase.anon_key));
        println!("  Table: {}", self.supabase.table);
        println!("  Bind address: {}", self.app.bind);
        if let Some(temp_dir) = &self.app.temp_dir {
            println!("  Scratch dir: {}", temp_dir.display());
        }
    }
}

fn redact(secret: &str) -> String {
    if secret.is_empty() {
        "(not set)".to_string()
    } else {
        format!("{}…", &secret[..secret.len().min(4)])
    }
}
