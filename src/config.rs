use crate::docstrings::DocstringStyle;
use crate::error::{Error, Result};
use crate::loader::{Filters, LoadOptions};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Config file looked up in the working directory when none is given
pub const DEFAULT_CONFIG_FILE: &str = "docatlas.toml";

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runtime: RuntimeConfig,
    pub loader: LoaderConfig,
}

/// Where Python modules are looked up
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub search_paths: Vec<PathBuf>,
}

/// Default options for every loaded root
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Member name rules; a leading `!` excludes
    pub filters: Vec<String>,
    pub members: Option<Vec<String>>,
    pub docstring_style: DocstringStyle,
    pub replace_admonitions: bool,
    pub show_source: bool,
    pub inherited_members: bool,
    pub max_depth: Option<usize>,
}

/// Per-request loader settings; unset fields fall back to the configured ones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderOverrides {
    pub filters: Option<Vec<String>>,
    pub members: Option<Vec<String>>,
    pub docstring_style: Option<DocstringStyle>,
    pub replace_admonitions: Option<bool>,
    pub show_source: Option<bool>,
    pub inherited_members: Option<bool>,
    pub max_depth: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            search_paths: vec![PathBuf::from(".")],
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            members: None,
            docstring_style: DocstringStyle::default(),
            replace_admonitions: false,
            show_source: false,
            inherited_members: false,
            max_depth: None,
        }
    }
}

impl LoaderConfig {
    /// Validate and compile into loader options
    pub fn to_options(&self) -> Result<LoadOptions> {
        self.validate_depth()?;
        Ok(LoadOptions {
            filters: Filters::parse(&self.filters)?,
            members: self.members.clone(),
            docstring_style: self.docstring_style,
            replace_admonitions: self.replace_admonitions,
            show_source: self.show_source,
            inherited_members: self.inherited_members,
            max_depth: self.max_depth,
        })
    }

    /// Copy with every set override applied
    pub fn with_overrides(&self, overrides: &LoaderOverrides) -> Self {
        Self {
            filters: overrides.filters.clone().unwrap_or_else(|| self.filters.clone()),
            members: overrides.members.clone().or_else(|| self.members.clone()),
            docstring_style: overrides.docstring_style.unwrap_or(self.docstring_style),
            replace_admonitions: overrides.replace_admonitions.unwrap_or(self.replace_admonitions),
            show_source: overrides.show_source.unwrap_or(self.show_source),
            inherited_members: overrides.inherited_members.unwrap_or(self.inherited_members),
            max_depth: overrides.max_depth.or(self.max_depth),
        }
    }

    fn validate(&self) -> Result<()> {
        Filters::parse(&self.filters)?;
        self.validate_depth()
    }

    fn validate_depth(&self) -> Result<()> {
        if let Some(depth) = self.max_depth {
            if depth == 0 {
                return Err(Error::config_validation("max_depth must be at least 1"));
            }
            if depth > 100 {
                return Err(Error::config_validation("max_depth cannot exceed 100"));
            }
        }

        Ok(())
    }
}

impl Config {
    /// Load config from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file, or defaults when the file does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Merge CLI arguments into config (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: CliOverrides) {
        if !cli.search_paths.is_empty() {
            let mut paths = cli.search_paths;
            paths.extend(self.runtime.search_paths.drain(..));
            self.runtime.search_paths = paths;
        }

        // Later rules win, so CLI filters go last
        self.loader.filters.extend(cli.filters);

        if let Some(members) = cli.members {
            self.loader.members = Some(members);
        }

        if let Some(style) = cli.docstring_style {
            self.loader.docstring_style = style;
        }

        if cli.replace_admonitions {
            self.loader.replace_admonitions = true;
        }

        if cli.show_source {
            self.loader.show_source = true;
        }

        if cli.inherited_members {
            self.loader.inherited_members = true;
        }

        if let Some(depth) = cli.max_depth {
            self.loader.max_depth = Some(depth);
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.runtime.search_paths.is_empty() {
            return Err(Error::config_validation("at least one search path required"));
        }

        self.loader.validate()
    }
}

/// Settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub search_paths: Vec<PathBuf>,
    pub filters: Vec<String>,
    pub members: Option<Vec<String>>,
    pub docstring_style: Option<DocstringStyle>,
    pub replace_admonitions: bool,
    pub show_source: bool,
    pub inherited_members: bool,
    pub max_depth: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.runtime.search_paths, vec![PathBuf::from(".")]);
        assert_eq!(config.loader.docstring_style, DocstringStyle::Google);
        assert!(!config.loader.replace_admonitions);
        assert!(config.loader.max_depth.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_valid_config() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[runtime]
search_paths = ["src", "vendor"]

[loader]
filters = ["!^_", "^__init__$"]
docstring_style = "restructured-text"
show_source = true
max_depth = 3
"#
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.runtime.search_paths, vec![PathBuf::from("src"), PathBuf::from("vendor")]);
        assert_eq!(config.loader.filters.len(), 2);
        assert_eq!(config.loader.docstring_style, DocstringStyle::RestructuredText);
        assert!(config.loader.show_source);
        assert_eq!(config.loader.max_depth, Some(3));
    }

    #[test]
    fn test_rst_alias() {
        let loader: LoaderConfig = toml::from_str(r#"docstring_style = "rst""#).unwrap();
        assert_eq!(loader.docstring_style, DocstringStyle::RestructuredText);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load(Path::new("/nonexistent/docatlas.toml"));
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(Config::load_or_default(Path::new("/nonexistent/docatlas.toml")).is_ok());
    }

    #[test]
    fn test_load_invalid_toml() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "[loader\nfilters = 3").unwrap();
        assert!(matches!(Config::load(file.path()), Err(Error::ConfigParse(_))));
    }

    #[test]
    fn test_validation_max_depth_zero() {
        let mut config = Config::default();
        config.loader.max_depth = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_max_depth_too_high() {
        let mut config = Config::default();
        config.loader.max_depth = Some(101);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_empty_search_paths() {
        let mut config = Config::default();
        config.runtime.search_paths.clear();
        assert!(matches!(config.validate(), Err(Error::ConfigValidation(_))));
    }

    #[test]
    fn test_validation_bad_filter() {
        let mut config = Config::default();
        config.loader.filters.push("([".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid filter pattern"));
    }

    #[test]
    fn test_merge_cli_search_paths_first() {
        let mut config = Config::default();
        config.merge_cli(CliOverrides {
            search_paths: vec![PathBuf::from("/custom")],
            ..CliOverrides::default()
        });
        assert_eq!(config.runtime.search_paths, vec![PathBuf::from("/custom"), PathBuf::from(".")]);
    }

    #[test]
    fn test_merge_cli_filters_appended() {
        let mut config = Config::default();
        config.loader.filters.push("!^_".to_string());
        config.merge_cli(CliOverrides {
            filters: vec!["^_private_ok$".to_string()],
            ..CliOverrides::default()
        });
        let options = config.loader.to_options().unwrap();
        assert!(options.filters.allows("_private_ok"));
        assert!(!options.filters.allows("_other"));
    }

    #[test]
    fn test_merge_cli_flags() {
        let mut config = Config::default();
        config.merge_cli(CliOverrides {
            members: Some(vec!["A".to_string()]),
            docstring_style: Some(DocstringStyle::Plain),
            show_source: true,
            inherited_members: true,
            max_depth: Some(2),
            ..CliOverrides::default()
        });
        assert_eq!(config.loader.members, Some(vec!["A".to_string()]));
        assert_eq!(config.loader.docstring_style, DocstringStyle::Plain);
        assert!(config.loader.show_source);
        assert!(config.loader.inherited_members);
        assert_eq!(config.loader.max_depth, Some(2));
    }

    #[test]
    fn test_overrides_fall_back_to_defaults() {
        let defaults = LoaderConfig {
            show_source: true,
            ..LoaderConfig::default()
        };
        let overrides: LoaderOverrides = serde_json::from_str(r#"{"max_depth": 2, "filters": []}"#).unwrap();
        let merged = defaults.with_overrides(&overrides);
        assert!(merged.show_source);
        assert_eq!(merged.max_depth, Some(2));
        assert!(merged.filters.is_empty());
        assert!(merged.to_options().unwrap().filters.is_empty());
    }

    #[test]
    fn test_overrides_are_validated() {
        let overrides: LoaderOverrides = serde_json::from_str(r#"{"max_depth": 0}"#).unwrap();
        let result = LoaderConfig::default().with_overrides(&overrides).to_options();
        assert!(matches!(result, Err(Error::ConfigValidation(_))));

        let overrides: LoaderOverrides = serde_json::from_str(r#"{"max_depth": 1000}"#).unwrap();
        assert!(LoaderConfig::default().with_overrides(&overrides).to_options().is_err());
    }
}
