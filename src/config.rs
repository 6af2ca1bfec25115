//! Configuration for the pdfmate core.
//!
//! All behaviour is controlled through [`BotConfig`], built via its
//! [`BotConfigBuilder`] or loaded from the environment with
//! [`BotConfig::from_env`]. Keeping every knob in one struct makes it
//! trivial to share across sessions and to log a snapshot of a run.

use crate::error::BotError;
use serde::Serialize;
use std::path::PathBuf;

/// Configuration for the bot core.
///
/// # Example
/// ```rust
/// use pdfmate::BotConfig;
///
/// let config = BotConfig::builder()
///     .input_root("/var/lib/pdfmate/input")
///     .output_root("/var/lib/pdfmate/output")
///     .workers(4)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct BotConfig {
    /// Directory staged inputs are downloaded into. Created externally;
    /// the core only writes files inside it.
    pub input_root: PathBuf,

    /// Directory transformation outputs are written to. Created externally.
    pub output_root: PathBuf,

    /// Locale code used when a user has not chosen one. Default: "en".
    pub default_locale: String,

    /// Cap on concurrently running external tools. Default: 4.
    ///
    /// External tools are the only blocking work in the system; this cap is
    /// the backpressure mechanism that keeps one user's slow compression
    /// from exhausting the process.
    pub workers: usize,

    /// Ghostscript binary used by the compress adapter. Default: "gs".
    pub ghostscript_bin: String,

    /// LibreOffice binary used by the subprocess convert adapter.
    /// Default: "soffice".
    pub soffice_bin: String,

    /// qpdf binary used by the rotate and merge adapters. Default: "qpdf".
    pub qpdf_bin: String,

    /// Converter-service endpoint. When set, office-to-PDF conversion goes
    /// over HTTP to this URL instead of invoking LibreOffice locally.
    pub converter_url: Option<String>,

    /// User ids allowed to use the `/admin` command.
    pub admins: Vec<i64>,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            input_root: PathBuf::from("input"),
            output_root: PathBuf::from("output"),
            default_locale: "en".to_string(),
            workers: 4,
            ghostscript_bin: "gs".to_string(),
            soffice_bin: "soffice".to_string(),
            qpdf_bin: "qpdf".to_string(),
            converter_url: None,
            admins: Vec::new(),
        }
    }
}

impl BotConfig {
    /// Create a new builder for `BotConfig`.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder {
            config: Self::default(),
        }
    }

    /// Load configuration from the environment.
    ///
    /// Recognized variables (unset ones keep their defaults):
    ///
    /// | Variable | Field |
    /// |----------|-------|
    /// | `FILE_INPUT_LOCATION`  | `input_root` |
    /// | `FILE_OUTPUT_LOCATION` | `output_root` |
    /// | `DEFAULT_LOCALE`       | `default_locale` |
    /// | `WORKER_POOL_SIZE`     | `workers` |
    /// | `GS_BIN`               | `ghostscript_bin` |
    /// | `SOFFICE_BIN`          | `soffice_bin` |
    /// | `QPDF_BIN`             | `qpdf_bin` |
    /// | `CONVERTER_URL`        | `converter_url` |
    /// | `ADMINS_LIST`          | `admins` (comma-separated ids) |
    pub fn from_env() -> Result<Self, BotError> {
        let mut builder = Self::builder();

        if let Ok(v) = std::env::var("FILE_INPUT_LOCATION") {
            builder = builder.input_root(v);
        }
        if let Ok(v) = std::env::var("FILE_OUTPUT_LOCATION") {
            builder = builder.output_root(v);
        }
        if let Ok(v) = std::env::var("DEFAULT_LOCALE") {
            builder = builder.default_locale(v);
        }
        if let Ok(v) = std::env::var("WORKER_POOL_SIZE") {
            let n = v.parse::<usize>().map_err(|_| {
                BotError::InvalidConfig(format!("WORKER_POOL_SIZE must be a number, got '{v}'"))
            })?;
            builder = builder.workers(n);
        }
        if let Ok(v) = std::env::var("GS_BIN") {
            builder = builder.ghostscript_bin(v);
        }
        if let Ok(v) = std::env::var("SOFFICE_BIN") {
            builder = builder.soffice_bin(v);
        }
        if let Ok(v) = std::env::var("QPDF_BIN") {
            builder = builder.qpdf_bin(v);
        }
        if let Ok(v) = std::env::var("CONVERTER_URL") {
            if !v.trim().is_empty() {
                builder = builder.converter_url(v);
            }
        }
        if let Ok(v) = std::env::var("ADMINS_LIST") {
            let admins = parse_admins(&v)?;
            builder = builder.admins(admins);
        }

        builder.build()
    }
}

/// Parse a comma-separated admin id list. Empty input means no admins.
fn parse_admins(raw: &str) -> Result<Vec<i64>, BotError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<i64>().map_err(|_| {
                BotError::InvalidConfig(format!("ADMINS_LIST entry '{s}' is not a user id"))
            })
        })
        .collect()
}

/// Builder for [`BotConfig`].
#[derive(Debug)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    pub fn input_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.input_root = path.into();
        self
    }

    pub fn output_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_root = path.into();
        self
    }

    pub fn default_locale(mut self, code: impl Into<String>) -> Self {
        self.config.default_locale = code.into();
        self
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.config.workers = n;
        self
    }

    pub fn ghostscript_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.ghostscript_bin = bin.into();
        self
    }

    pub fn soffice_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.soffice_bin = bin.into();
        self
    }

    pub fn qpdf_bin(mut self, bin: impl Into<String>) -> Self {
        self.config.qpdf_bin = bin.into();
        self
    }

    pub fn converter_url(mut self, url: impl Into<String>) -> Self {
        self.config.converter_url = Some(url.into());
        self
    }

    pub fn admins(mut self, admins: Vec<i64>) -> Self {
        self.config.admins = admins;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BotConfig, BotError> {
        let c = &self.config;
        if c.workers == 0 {
            return Err(BotError::InvalidConfig("workers must be ≥ 1".into()));
        }
        if c.input_root.as_os_str().is_empty() {
            return Err(BotError::InvalidConfig("input_root must not be empty".into()));
        }
        if c.output_root.as_os_str().is_empty() {
            return Err(BotError::InvalidConfig(
                "output_root must not be empty".into(),
            ));
        }
        if c.input_root == c.output_root {
            return Err(BotError::InvalidConfig(
                "input_root and output_root must differ".into(),
            ));
        }
        if c.default_locale.is_empty() {
            return Err(BotError::InvalidConfig(
                "default_locale must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}
