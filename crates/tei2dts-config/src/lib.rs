//! Configuration management for tei2dts.
//!
//! Parses `tei2dts.toml` configuration files with serde and provides
//! auto-discovery of config files in parent directories.
//!
//! CLI settings can be applied during load via [`CliSettings`].
//!
//! ## Environment Variable Expansion
//!
//! String configuration values support environment variable expansion:
//!
//! - `${VAR}` - expands to the value of VAR, errors if unset
//! - `${VAR:-default}` - expands to VAR if set, otherwise uses default
//!
//! Expanded fields:
//! - `navigation.id_prefix`
//! - `output.dir`
//! - `output.api_base`
//! - `output.document_path`
//! - `output.navigation_path`

mod expand;

use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

use tei2dts_core::{ConvertOptions, LeadingContent, NavigationMode};

/// CLI settings that override configuration file values.
///
/// All fields are optional. Only non-None values override the loaded config.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override navigation mode.
    pub mode: Option<NavigationMode>,
    /// Override generated identifier prefix.
    pub id_prefix: Option<String>,
    /// Override flat-mode leading content policy.
    pub leading_content: Option<LeadingContent>,
    /// Override output directory.
    pub output_dir: Option<PathBuf>,
    /// Override API base URL.
    pub api_base: Option<String>,
    /// Override document endpoint sub-path.
    pub document_path: Option<String>,
    /// Override navigation endpoint sub-path.
    pub navigation_path: Option<String>,
}

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "tei2dts.toml";

const DEFAULT_OUTPUT_DIR: &str = "dts";
const DEFAULT_DOCUMENT_PATH: &str = "document";
const DEFAULT_NAVIGATION_PATH: &str = "navigation";

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Navigation configuration.
    pub navigation: NavigationConfig,
    /// Output configuration (paths are relative strings from TOML).
    output: OutputConfigRaw,

    /// Resolved output configuration (set after loading).
    #[serde(skip)]
    pub output_resolved: OutputConfig,
    /// Path to the config file (set after loading).
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

/// Navigation configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// How units are derived from the document.
    pub mode: NavigationMode,
    /// Prefix of generated identifiers.
    pub id_prefix: String,
    /// Flat-mode handling of content before the first page break.
    pub leading_content: LeadingContent,
}

/// Raw output configuration as parsed from TOML.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    api_base: Option<String>,
    document_path: Option<String>,
    navigation_path: Option<String>,
}

/// Resolved output configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    /// Directory the file tree is written to.
    pub dir: PathBuf,
    /// Base URL prepended to every reference.
    pub api_base: String,
    /// Sub-path of the document endpoint.
    pub document_path: String,
    /// Sub-path of the navigation endpoint.
    pub navigation_path: String,
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g., "`output.api_base`").
        field: String,
        /// Error message (e.g., "${`DTS_BASE`} not set").
        message: String,
    },
}

/// Require a sub-path to be relative, non-empty and free of `..`.
fn require_relative_sub_path(value: &str, field: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    if value.starts_with('/') || Path::new(value).is_absolute() {
        return Err(ConfigError::Validation(format!(
            "{field} must be a relative path"
        )));
    }
    if Path::new(trimmed)
        .components()
        .any(|c| !matches!(c, Component::Normal(_)))
    {
        return Err(ConfigError::Validation(format!(
            "{field} cannot contain '.' or '..' segments"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration from file with optional CLI settings.
    ///
    /// If `config_path` is provided, loads from that file.
    /// Otherwise, searches for `tei2dts.toml` in current directory and parents.
    ///
    /// CLI settings are applied after loading and path resolution, allowing CLI
    /// arguments to take precedence over config file values.
    ///
    /// # Errors
    ///
    /// Returns error if explicit `config_path` doesn't exist, parsing fails,
    /// or the resulting configuration is invalid.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            Self::default_with_cwd()
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    /// Conversion options for the core pipeline.
    #[must_use]
    pub fn convert_options(&self) -> ConvertOptions {
        ConvertOptions {
            mode: self.navigation.mode,
            id_prefix: self.navigation.id_prefix.clone(),
            leading_content: self.navigation.leading_content,
        }
    }

    /// Apply CLI settings to the configuration.
    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(mode) = settings.mode {
            self.navigation.mode = mode;
        }
        if let Some(id_prefix) = &settings.id_prefix {
            self.navigation.id_prefix.clone_from(id_prefix);
        }
        if let Some(leading_content) = settings.leading_content {
            self.navigation.leading_content = leading_content;
        }
        if let Some(dir) = &settings.output_dir {
            self.output_resolved.dir.clone_from(dir);
        }
        if let Some(api_base) = &settings.api_base {
            self.output_resolved.api_base.clone_from(api_base);
        }
        if let Some(document_path) = &settings.document_path {
            self.output_resolved.document_path.clone_from(document_path);
        }
        if let Some(navigation_path) = &settings.navigation_path {
            self.output_resolved
                .navigation_path
                .clone_from(navigation_path);
        }
    }

    /// Search for config file in current directory and parents.
    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Create default config with paths relative to current working directory.
    fn default_with_cwd() -> Self {
        let cwd = std::env::current_dir().unwrap_or_default();
        Self::default_with_base(&cwd)
    }

    /// Create default config with paths relative to given base directory.
    fn default_with_base(base: &Path) -> Self {
        Self {
            navigation: NavigationConfig::default(),
            output: OutputConfigRaw::default(),
            output_resolved: OutputConfig {
                dir: base.join(DEFAULT_OUTPUT_DIR),
                api_base: String::new(),
                document_path: DEFAULT_DOCUMENT_PATH.to_owned(),
                navigation_path: DEFAULT_NAVIGATION_PATH.to_owned(),
            },
            config_path: None,
        }
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        // Expand environment variables before path resolution
        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(config_dir);
        config.config_path = Some(path.to_path_buf());

        // Validate configuration after loading and resolution
        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// Called automatically after loading from file and after applying CLI
    /// settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` if any validation fails.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_navigation()?;
        self.validate_output()?;
        Ok(())
    }

    /// Validate navigation configuration.
    fn validate_navigation(&self) -> Result<(), ConfigError> {
        if self.navigation.id_prefix.chars().any(char::is_whitespace) {
            return Err(ConfigError::Validation(
                "navigation.id_prefix cannot contain whitespace".to_owned(),
            ));
        }
        Ok(())
    }

    /// Validate output configuration.
    fn validate_output(&self) -> Result<(), ConfigError> {
        let output = &self.output_resolved;
        if output.dir.as_os_str().is_empty() {
            return Err(ConfigError::Validation(
                "output.dir cannot be empty".to_owned(),
            ));
        }
        require_relative_sub_path(&output.document_path, "output.document_path")?;
        require_relative_sub_path(&output.navigation_path, "output.navigation_path")?;
        if output.document_path.trim_matches('/') == output.navigation_path.trim_matches('/') {
            return Err(ConfigError::Validation(
                "output.document_path and output.navigation_path must differ".to_owned(),
            ));
        }
        Ok(())
    }

    /// Expand environment variable references in configuration strings.
    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.navigation.id_prefix =
            expand::expand_env(&self.navigation.id_prefix, "navigation.id_prefix")?;

        let output = &mut self.output;
        for (value, field) in [
            (&mut output.dir, "output.dir"),
            (&mut output.api_base, "output.api_base"),
            (&mut output.document_path, "output.document_path"),
            (&mut output.navigation_path, "output.navigation_path"),
        ] {
            if let Some(raw) = value.take() {
                *value = Some(expand::expand_env(&raw, field)?);
            }
        }

        Ok(())
    }

    /// Resolve relative paths against the config directory.
    fn resolve_paths(&mut self, config_dir: &Path) {
        let output = &self.output;
        self.output_resolved = OutputConfig {
            dir: config_dir.join(output.dir.as_deref().unwrap_or(DEFAULT_OUTPUT_DIR)),
            api_base: output.api_base.clone().unwrap_or_default(),
            document_path: output
                .document_path
                .clone()
                .unwrap_or_else(|| DEFAULT_DOCUMENT_PATH.to_owned()),
            navigation_path: output
                .navigation_path
                .clone()
                .unwrap_or_else(|| DEFAULT_NAVIGATION_PATH.to_owned()),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = Config::default_with_base(Path::new("/test"));
        assert_eq!(config.navigation.mode, NavigationMode::Hierarchical);
        assert_eq!(config.navigation.id_prefix, "");
        assert_eq!(config.navigation.leading_content, LeadingContent::Keep);
        assert_eq!(
            config.output_resolved,
            OutputConfig {
                dir: PathBuf::from("/test/dts"),
                api_base: String::new(),
                document_path: "document".to_owned(),
                navigation_path: "navigation".to_owned(),
            }
        );
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.navigation.mode, NavigationMode::Hierarchical);
        assert!(config.output.dir.is_none());
    }

    #[test]
    fn test_parse_navigation_config() {
        let toml = r#"
[navigation]
mode = "flat"
id_prefix = "pg"
leading_content = "drop"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.navigation.mode, NavigationMode::Flat);
        assert_eq!(config.navigation.id_prefix, "pg");
        assert_eq!(config.navigation.leading_content, LeadingContent::Drop);
    }

    #[test]
    fn test_parse_invalid_mode() {
        let toml = r#"
[navigation]
mode = "pages"
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_resolve_paths() {
        let toml = r#"
[output]
dir = "public/dts"
api_base = "https://example.org/api/dts"
document_path = "docs"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.resolve_paths(Path::new("/project"));

        assert_eq!(config.output_resolved.dir, PathBuf::from("/project/public/dts"));
        assert_eq!(config.output_resolved.api_base, "https://example.org/api/dts");
        assert_eq!(config.output_resolved.document_path, "docs");
        assert_eq!(config.output_resolved.navigation_path, "navigation");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(
            &path,
            r#"
[navigation]
mode = "flat"

[output]
dir = "out"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path), None).unwrap();

        assert_eq!(config.navigation.mode, NavigationMode::Flat);
        assert_eq!(config.output_resolved.dir, dir.path().join("out"));
        assert_eq!(config.config_path, Some(path));
    }

    #[test]
    fn test_load_missing_file() {
        let err = Config::load(Some(Path::new("/nonexistent/tei2dts.toml")), None).unwrap_err();

        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn test_load_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[navigation\nmode = ").unwrap();

        let err = Config::load(Some(&path), None).unwrap_err();

        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_apply_cli_settings() {
        let mut config = Config::default_with_base(Path::new("/test"));
        let settings = CliSettings {
            mode: Some(NavigationMode::Flat),
            id_prefix: Some("p".to_owned()),
            leading_content: Some(LeadingContent::Drop),
            output_dir: Some(PathBuf::from("/out")),
            api_base: Some("https://x.test".to_owned()),
            document_path: Some("doc".to_owned()),
            navigation_path: Some("nav".to_owned()),
        };

        config.apply_cli_settings(&settings);

        assert_eq!(config.navigation.mode, NavigationMode::Flat);
        assert_eq!(config.navigation.id_prefix, "p");
        assert_eq!(config.navigation.leading_content, LeadingContent::Drop);
        assert_eq!(config.output_resolved.dir, PathBuf::from("/out"));
        assert_eq!(config.output_resolved.api_base, "https://x.test");
        assert_eq!(config.output_resolved.document_path, "doc");
        assert_eq!(config.output_resolved.navigation_path, "nav");
    }

    #[test]
    fn test_apply_cli_settings_empty() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.apply_cli_settings(&CliSettings::default());

        assert_eq!(config.navigation.mode, NavigationMode::Hierarchical);
        assert_eq!(config.output_resolved.dir, PathBuf::from("/test/dts"));
    }

    #[test]
    fn test_cli_settings_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "[navigation]\nmode = \"flat\"\nid_prefix = \"f\"\n").unwrap();
        let settings = CliSettings {
            mode: Some(NavigationMode::Hierarchical),
            ..CliSettings::default()
        };

        let config = Config::load(Some(&path), Some(&settings)).unwrap();

        assert_eq!(config.navigation.mode, NavigationMode::Hierarchical);
        assert_eq!(config.navigation.id_prefix, "f");
    }

    #[test]
    fn test_convert_options() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.navigation.mode = NavigationMode::Flat;
        config.navigation.id_prefix = "u".to_owned();

        let options = config.convert_options();

        assert_eq!(options.mode, NavigationMode::Flat);
        assert_eq!(options.id_prefix, "u");
        assert_eq!(options.leading_content, LeadingContent::Keep);
    }

    #[test]
    fn test_expand_env_vars_output() {
        // SAFETY: test runs single-threaded per test function
        unsafe {
            std::env::set_var("TEI2DTS_TEST_API_BASE", "https://dts.test");
        }

        let toml = r#"
[output]
api_base = "${TEI2DTS_TEST_API_BASE}/api"
document_path = "${TEI2DTS_TEST_UNSET_DOC:-doc}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        config.expand_env_vars().unwrap();

        assert_eq!(config.output.api_base.as_deref(), Some("https://dts.test/api"));
        assert_eq!(config.output.document_path.as_deref(), Some("doc"));

        unsafe {
            std::env::remove_var("TEI2DTS_TEST_API_BASE");
        }
    }

    #[test]
    fn test_expand_env_vars_missing_required_var() {
        let toml = r#"
[navigation]
id_prefix = "${TEI2DTS_MISSING_VAR_CONFIG_TEST}"
"#;
        let mut config: Config = toml::from_str(toml).unwrap();
        let err = config.expand_env_vars().unwrap_err();

        assert!(matches!(err, ConfigError::EnvVar { .. }));
        assert!(err.to_string().contains("navigation.id_prefix"));
    }

    // Validation tests

    /// Assert that validation fails with expected substrings in the error message.
    fn assert_validation_error(config: &Config, expected_substrings: &[&str]) {
        let result = config.validate();
        assert!(result.is_err(), "Expected validation to fail");
        let err = result.unwrap_err();
        assert!(
            matches!(err, ConfigError::Validation(_)),
            "Expected ConfigError::Validation, got {err:?}"
        );
        let msg = err.to_string();
        for s in expected_substrings {
            assert!(
                msg.contains(s),
                "Expected error to contain '{s}', got: {msg}"
            );
        }
    }

    #[test]
    fn test_validate_default_config_passes() {
        let config = Config::default_with_base(Path::new("/test"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_absolute_sub_path() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.document_path = "/etc".to_owned();
        assert_validation_error(&config, &["output.document_path", "relative"]);
    }

    #[test]
    fn test_validate_parent_sub_path() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.navigation_path = "nav/../../x".to_owned();
        assert_validation_error(&config, &["output.navigation_path", ".."]);
    }

    #[test]
    fn test_validate_empty_sub_path() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.document_path = "/".to_owned();
        assert_validation_error(&config, &["output.document_path", "empty"]);
    }

    #[test]
    fn test_validate_nested_sub_path_passes() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.document_path = "api/document/".to_owned();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_same_sub_paths() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.output_resolved.navigation_path = "document".to_owned();
        assert_validation_error(&config, &["must differ"]);
    }

    #[test]
    fn test_validate_prefix_whitespace() {
        let mut config = Config::default_with_base(Path::new("/test"));
        config.navigation.id_prefix = "a b".to_owned();
        assert_validation_error(&config, &["navigation.id_prefix"]);
    }
}
