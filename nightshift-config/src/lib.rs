//! Run configuration: YAML file, inline YAML and environment overlays.
//!
//! Sources merge in the order they are added. `${VAR}` placeholders in any
//! string are then resolved once from the process environment, which is how
//! `GPS_USER`, `EMAIL_FROM` and friends reach the settings even when no file
//! is given. A string that names an unset variable resolves to an empty
//! value, which the accessors in [`settings`] treat as "not supplied".
//!
//! `NIGHTSHIFT__`-prefixed environment variables are applied last
//! (`NIGHTSHIFT__DOWNLOADS__TIMEOUT_SECS=90`) and taken literally.
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File, FileFormat};
use serde_json::Value;
use std::env::VarError;
use std::path::Path;

pub mod settings;

pub use settings::{
    supplied, BrowserConfig, Credentials, DiagnosticsConfig, DownloadConfig, LoginConfig,
    NightshiftConfig, NotifyConfig, OcrConfig, PortalConfig, ReportConfig, SummaryConfig,
};

const ENV_PREFIX: &str = "NIGHTSHIFT";

/// Settings read from the environment unless a source overrides them.
const SECRET_PLACEHOLDERS: [(&str, &str); 5] = [
    ("portal.username", "${GPS_USER}"),
    ("portal.password", "${GPS_PASSWORD}"),
    ("notify.from", "${EMAIL_FROM}"),
    ("notify.password", "${EMAIL_PASSWORD}"),
    ("notify.to", "${EMAIL_TO}"),
];

pub struct NightshiftConfigLoader {
    builder: ConfigBuilder<DefaultState>,
    env_prefix: String,
}

impl Default for NightshiftConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl NightshiftConfigLoader {
    /// Defaults plus environment overrides; no file is required.
    ///
    /// ```
    /// use nightshift_config::NightshiftConfigLoader;
    ///
    /// let config = NightshiftConfigLoader::new().load().expect("defaults load");
    /// assert_eq!(config.login.max_attempts, 20);
    /// assert_eq!(config.summary.sheet_name, "Summary_Pivot");
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
            env_prefix: ENV_PREFIX.to_string(),
        }
    }

    /// Merge a configuration file that must exist.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_file(path.as_ref(), true)
    }

    /// Merge a configuration file only when it is present, so scheduled runs
    /// can rely on the environment alone.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Self {
        self.add_file(path.as_ref(), false)
    }

    /// Merge an inline YAML snippet.
    ///
    /// ```
    /// use nightshift_config::NightshiftConfigLoader;
    ///
    /// let cfg = NightshiftConfigLoader::new()
    ///     .with_yaml_str(
    ///         r#"
    /// downloads:
    ///   directory: "/srv/nightshift/downloads"
    ///   timeout_secs: 90
    /// "#,
    ///     )
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(cfg.downloads.timeout_secs, 90);
    /// assert_eq!(cfg.downloads.poll_interval_ms, 2_000);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self.builder.add_source(File::from_str(yaml, FileFormat::Yaml));
        self
    }

    /// Read overrides from `<prefix>__SECTION__KEY` instead of `NIGHTSHIFT__…`.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    /// Merge all sources, resolve placeholders and build the typed settings.
    ///
    /// ```
    /// use nightshift_config::NightshiftConfigLoader;
    ///
    /// temp_env::with_vars(
    ///     [("DOC_PORTAL_USER", Some("fleet-admin")), ("DOC_PORTAL_PASSWORD_UNSET", None)],
    ///     || {
    ///         let config = NightshiftConfigLoader::new()
    ///             .with_yaml_str(r#"
    /// portal:
    ///   username: "${DOC_PORTAL_USER}"
    ///   password: "${DOC_PORTAL_PASSWORD_UNSET}"
    /// "#)
    ///             .load()
    ///             .expect("valid configuration");
    ///
    ///         let creds = config.portal.credentials();
    ///         assert_eq!(creds.username, "fleet-admin");
    ///         assert!(creds.password.is_empty());
    ///     },
    /// );
    /// ```
    pub fn load(self) -> Result<NightshiftConfig, ConfigError> {
        let mut builder = self.builder;
        for (key, placeholder) in SECRET_PLACEHOLDERS {
            builder = builder.set_default(key, placeholder)?;
        }
        let mut merged: Value = builder.build()?.try_deserialize()?;
        resolve_placeholders(&mut merged);

        // Environment values arrive as strings; building through `Config`
        // lets "90" land in numeric fields.
        Config::builder()
            .add_source(Config::try_from(&merged)?)
            .add_source(Environment::with_prefix(&self.env_prefix).separator("__"))
            .build()?
            .try_deserialize()
    }

    fn add_file(mut self, path: &Path, required: bool) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path).required(required));
        self
    }
}

/// Replace `${VAR}` references in every string of a JSON tree.
fn resolve_placeholders(value: &mut Value) {
    match value {
        Value::String(text) if text.contains("${") => {
            *text = expand_placeholders(text).unwrap_or_default()
        }
        Value::Array(items) => items.iter_mut().for_each(resolve_placeholders),
        Value::Object(fields) => fields.values_mut().for_each(resolve_placeholders),
        _ => {}
    }
}

/// Expand variable references in a single pass; substituted values are
/// inserted verbatim. `None` when any referenced variable is unset.
fn expand_placeholders(raw: &str) -> Option<String> {
    let mut unset = false;
    let expanded = shellexpand::env_with_context(raw, |name: &str| match std::env::var(name) {
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => {
            unset = true;
            Ok(None)
        }
        Err(err) => Err(err),
    });
    match expanded {
        Ok(text) if !unset => Some(text.into_owned()),
        _ => None,
    }
}
