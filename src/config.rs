use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

const DEFAULT_CONFIG_PATH: &str = "product_bot.toml";
const ENV_PREFIX: &str = "PRODUCT_BOT";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    #[serde(skip_serializing)]
    pub bot_token: Option<String>,
    pub test_url: String,
    pub http: HttpConfig,
    pub extractor: ExtractorConfig,
    pub format: FormatConfig,
    pub monitor: MonitorConfig,
    pub storage: StorageConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_seconds: u64,
    pub max_attempts: u32,
    pub retry_delay_ms: u64,
    pub pool_max_idle_per_host: usize,
    /// Rotated across attempts, first entry is the client default.
    pub user_agents: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    pub max_items: usize,
    /// Item container selectors in priority order.
    pub container_selectors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub max_reply_items: usize,
    pub currency: String,
    pub send_photos: bool,
    pub max_photo_cards: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub enabled: bool,
    pub scan_interval_seconds: u64,
    pub notify_chat_ids: Vec<i64>,
    pub categories: Vec<CategoryConfig>,
    pub notify_on_first_run: bool,
    pub notify_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryConfig {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    /// Defaults to `data.json` or `products.db` depending on the backend.
    pub path: Option<PathBuf>,
    /// Existing JSON snapshot to seed the SQLite backend from.
    pub import_json: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot_token: None,
            test_url: "https://books.toscrape.com/".to_string(),
            http: HttpConfig::default(),
            extractor: ExtractorConfig::default(),
            format: FormatConfig::default(),
            monitor: MonitorConfig::default(),
            storage: StorageConfig::default(),
            log: LogConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            max_attempts: 4,
            retry_delay_ms: 1500,
            pool_max_idle_per_host: 6,
            user_agents: vec![
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
                "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.1 Safari/605.1.15".to_string(),
                "Mozilla/5.0 (X11; Linux x86_64; rv:121.0) Gecko/20100101 Firefox/121.0".to_string(),
            ],
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            max_items: 10,
            container_selectors: [
                ".product",
                ".product-item",
                ".product-card",
                ".item",
                "li.product",
                "article.product",
                r#"[class*="product"]"#,
                r#"[class*="item"]"#,
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            max_reply_items: 5,
            currency: "₾".to_string(),
            send_photos: true,
            max_photo_cards: 3,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_seconds: 3600,
            notify_chat_ids: Vec::new(),
            categories: Vec::new(),
            notify_on_first_run: false,
            notify_delay_ms: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Json,
            path: None,
            import_json: None,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl StorageConfig {
    pub fn path(&self) -> PathBuf {
        match (&self.path, self.backend) {
            (Some(path), _) => path.clone(),
            (None, StorageBackend::Json) => PathBuf::from("data.json"),
            (None, StorageBackend::Sqlite) => PathBuf::from("products.db"),
        }
    }
}

impl MonitorConfig {
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_seconds)
    }

    pub fn notify_delay(&self) -> Duration {
        Duration::from_millis(self.notify_delay_ms)
    }
}

impl Config {
    /// Defaults, then `product_bot.toml` (or `$PRODUCT_BOT_CONFIG`), then
    /// `PRODUCT_BOT_*` environment variables, then `BOT_TOKEN`.
    pub fn load() -> Result<Self> {
        let path = std::env::var("PRODUCT_BOT_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

        let settings = config::Config::builder()
            .add_source(config::File::with_name(&path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("Failed to read configuration from {}", path))?;

        let mut config: Config = settings
            .try_deserialize()
            .context("Failed to parse configuration")?;

        if config.bot_token.is_none() {
            config.bot_token = std::env::var("BOT_TOKEN")
                .or_else(|_| std::env::var("TELOXIDE_TOKEN"))
                .ok()
                .filter(|t| !t.trim().is_empty());
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let config: Config = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?
            .try_deserialize()
            .context("Failed to parse configuration")?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.http.user_agents.is_empty() {
            bail!("http.user_agents must contain at least one User-Agent");
        }
        if self.http.max_attempts == 0 {
            bail!("http.max_attempts must be at least 1");
        }
        if self.monitor.scan_interval_seconds == 0 {
            bail!("monitor.scan_interval_seconds must be greater than zero");
        }
        if self.extractor.container_selectors.is_empty() {
            bail!("extractor.container_selectors must not be empty");
        }
        Url::parse(&self.test_url).with_context(|| format!("test_url '{}' is not a valid URL", self.test_url))?;

        for category in &self.monitor.categories {
            Url::parse(&category.url).with_context(|| {
                format!("category '{}' has an invalid URL '{}'", category.name, category.url)
            })?;
        }

        Ok(())
    }
}
