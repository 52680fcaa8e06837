use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use heck::ToSnakeCase;
use indexmap::IndexMap;
use serde::Deserialize;

use crate::error::ConfigError;

/// The API modules processed when no module list is configured.
pub const DEFAULT_MODULES: [&str; 7] = [
    "core",
    "auth",
    "discovery",
    "search",
    "search-sql",
    "workflow",
    "model",
];

/// Top-level project configuration loaded from `cmsgen.yaml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CmsgenConfig {
    /// Directory holding one raw legacy spec per module.
    pub spec_dir: String,
    /// Root of every generated artifact.
    pub output_dir: String,
    /// Extension of raw spec files (`yaml` or `json`).
    pub spec_extension: String,
    pub modules: Vec<String>,
    /// Module name → raw spec file, for specs not named after their module.
    pub spec_files: IndexMap<String, String>,
    /// Prefix of generated Python package names.
    pub package_prefix: String,
    /// Upper bound on each external generator run.
    pub timeout_secs: u64,
    pub client_generator: ToolConfig,
    pub model_generator: ToolConfig,
}

impl Default for CmsgenConfig {
    fn default() -> Self {
        Self {
            spec_dir: "specs".to_string(),
            output_dir: "generated".to_string(),
            spec_extension: "yaml".to_string(),
            modules: DEFAULT_MODULES.iter().map(|m| m.to_string()).collect(),
            spec_files: IndexMap::new(),
            package_prefix: "cms".to_string(),
            timeout_secs: 120,
            client_generator: ToolConfig::client_default(),
            model_generator: ToolConfig::model_default(),
        }
    }
}

/// An external generator: the program to invoke and extra trailing arguments.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ToolConfig {
    pub program: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
}

impl ToolConfig {
    pub fn client_default() -> Self {
        Self {
            program: "openapi-generator-cli".to_string(),
            extra_args: Vec::new(),
        }
    }

    pub fn model_default() -> Self {
        Self {
            program: "datamodel-codegen".to_string(),
            extra_args: Vec::new(),
        }
    }
}

impl CmsgenConfig {
    /// Raw spec path of a module.
    pub fn spec_path(&self, module: &str) -> PathBuf {
        let file = self
            .spec_files
            .get(module)
            .cloned()
            .unwrap_or_else(|| format!("{module}.{}", self.spec_extension));
        Path::new(&self.spec_dir).join(file)
    }

    /// Check that the module list can be run at all.
    ///
    /// Module names must be non-empty and stay distinct once snake-cased,
    /// since output paths are derived from the snake-case form.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.modules.is_empty() {
            return Err(ConfigError::Invalid("module list is empty".to_string()));
        }
        let mut seen = HashSet::new();
        for module in &self.modules {
            if module.trim().is_empty() {
                return Err(ConfigError::Invalid("module names must not be blank".to_string()));
            }
            if !seen.insert(module.to_snake_case()) {
                return Err(ConfigError::Invalid(format!(
                    "module `{module}` collides with another module's output paths"
                )));
            }
        }
        if let Some(unknown) = self.spec_files.keys().find(|k| !self.modules.contains(k)) {
            log::warn!("spec_files entry for unknown module `{unknown}` is ignored");
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be positive".to_string()));
        }
        Ok(())
    }

    /// Keep only the named modules, in configured order.
    pub fn select(&mut self, only: &[String]) -> Result<(), ConfigError> {
        if only.is_empty() {
            return Ok(());
        }
        if let Some(missing) = only.iter().find(|m| !self.modules.contains(m)) {
            return Err(ConfigError::Invalid(format!("unknown module `{missing}`")));
        }
        self.modules.retain(|m| only.contains(m));
        Ok(())
    }
}

/// Default config file name.
pub const CONFIG_FILE_NAME: &str = "cmsgen.yaml";

/// Load config from a YAML file. Returns `None` if the file doesn't exist.
pub fn load_config(path: &Path) -> Result<Option<CmsgenConfig>, ConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: CmsgenConfig =
        serde_yaml_ng::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(Some(config))
}

/// Generate the default config file content.
pub fn default_config_content() -> &'static str {
    r#"# cmsgen configuration
spec_dir: specs             # raw legacy specs, one per module
output_dir: generated
spec_extension: yaml        # yaml | json
modules:
  - core
  - auth
  - discovery
  - search
  - search-sql
  - workflow
  - model
spec_files: {}
  # search-sql: sql-search.json   # module -> file name when it differs
package_prefix: cms
timeout_secs: 120

client_generator:
  program: openapi-generator-cli
  extra_args: []
model_generator:
  program: datamodel-codegen
  extra_args: []
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CmsgenConfig::default();
        assert_eq!(config.spec_dir, "specs");
        assert_eq!(config.output_dir, "generated");
        assert_eq!(config.modules.len(), DEFAULT_MODULES.len());
        assert_eq!(config.timeout_secs, 120);
        assert_eq!(config.client_generator.program, "openapi-generator-cli");
        assert_eq!(config.model_generator.program, "datamodel-codegen");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config_yaml() {
        let yaml = r#"
spec_dir: api-specs
output_dir: out
modules: [core, search-sql]
spec_files:
  search-sql: sql-search.json
timeout_secs: 30
client_generator:
  program: /opt/bin/openapi-generator
  extra_args: [--skip-validate-spec]
"#;
        let config: CmsgenConfig = serde_yaml_ng::from_str(yaml).unwrap();
        assert_eq!(config.modules, vec!["core", "search-sql"]);
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.client_generator.extra_args, vec!["--skip-validate-spec"]);
        // Defaults applied
        assert_eq!(config.model_generator, ToolConfig::model_default());
        assert_eq!(config.package_prefix, "cms");

        assert_eq!(config.spec_path("core"), Path::new("api-specs").join("core.yaml"));
        assert_eq!(
            config.spec_path("search-sql"),
            Path::new("api-specs").join("sql-search.json")
        );
    }

    #[test]
    fn test_validate_rejects_empty_and_colliding_modules() {
        let mut config = CmsgenConfig {
            modules: Vec::new(),
            ..CmsgenConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.modules = vec!["search-sql".to_string(), "search_sql".to_string()];
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_select_subset() {
        let mut config = CmsgenConfig::default();
        config
            .select(&["search".to_string(), "core".to_string()])
            .unwrap();
        assert_eq!(config.modules, vec!["core", "search"]);

        assert!(config.select(&["nope".to_string()]).is_err());
    }

    #[test]
    fn test_default_content_matches_defaults() {
        let parsed: CmsgenConfig = serde_yaml_ng::from_str(default_config_content()).unwrap();
        let defaults = CmsgenConfig::default();
        assert_eq!(parsed.modules, defaults.modules);
        assert_eq!(parsed.spec_dir, defaults.spec_dir);
        assert_eq!(parsed.timeout_secs, defaults.timeout_secs);
        assert_eq!(parsed.client_generator, defaults.client_generator);
        assert_eq!(parsed.model_generator, defaults.model_generator);
    }

    #[test]
    fn test_missing_config_file() {
        let loaded = load_config(Path::new("definitely/not/here/cmsgen.yaml")).unwrap();
        assert!(loaded.is_none());
    }
}
