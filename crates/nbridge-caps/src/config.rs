use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use nbridge_contracts::NBRIDGE_LINK_CONFIG_SCHEMA_VERSION;

use crate::Capability;

pub const ENV_MULTITHREADING: &str = "NBRIDGE_MULTITHREADING";
pub const ENV_VIRTUAL_THREADS: &str = "NBRIDGE_VIRTUAL_THREADS";
pub const ENV_CONTINUATIONS: &str = "NBRIDGE_CONTINUATIONS";
pub const ENV_CHECK_FEATURES: &str = "NBRIDGE_CHECK_FEATURES";

/// Resolved build configuration: which optional capabilities the target
/// runtime provides, and whether unsupported-feature checking is enforced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LinkConfig {
    pub multithreading: bool,
    pub virtual_threads: bool,
    pub continuations: bool,
    pub check_features: bool,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::compiled()
    }
}

impl LinkConfig {
    /// Configuration implied by the cargo features this crate was built with.
    pub const fn compiled() -> Self {
        Self {
            multithreading: cfg!(feature = "multithreading"),
            virtual_threads: cfg!(feature = "virtual-threads"),
            continuations: cfg!(feature = "continuations"),
            check_features: true,
        }
    }

    pub fn supports(&self, cap: Capability) -> bool {
        match cap {
            Capability::Threads => self.multithreading,
            Capability::VirtualThreads => self.virtual_threads,
            Capability::Continuations => self.continuations,
        }
    }

    pub fn enabled(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.supports(*c))
            .collect()
    }

    fn apply(&mut self, o: &LinkConfigOverrides) {
        if let Some(v) = o.multithreading {
            self.multithreading = v;
        }
        if let Some(v) = o.virtual_threads {
            self.virtual_threads = v;
        }
        if let Some(v) = o.continuations {
            self.continuations = v;
        }
        if let Some(v) = o.check_features {
            self.check_features = v;
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.virtual_threads && !self.continuations {
            return Err(ConfigError::Inconsistent(
                "virtual threads require continuations".to_string(),
            ));
        }
        if self.virtual_threads && !self.multithreading {
            return Err(ConfigError::Inconsistent(
                "virtual threads require multithreading".to_string(),
            ));
        }
        Ok(())
    }
}

/// Partial configuration, as found in a config file, the environment or on
/// the command line. `None` leaves the lower-precedence value untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkConfigOverrides {
    pub multithreading: Option<bool>,
    pub virtual_threads: Option<bool>,
    pub continuations: Option<bool>,
    pub check_features: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LinkConfigFile {
    schema_version: String,
    #[serde(default)]
    multithreading: Option<bool>,
    #[serde(default)]
    virtual_threads: Option<bool>,
    #[serde(default)]
    continuations: Option<bool>,
    #[serde(default)]
    check_features: Option<bool>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("read config {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse config {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(
        "config {}: schema_version {found:?} (expected {:?})",
        .path.display(),
        NBRIDGE_LINK_CONFIG_SCHEMA_VERSION
    )]
    SchemaVersion { path: PathBuf, found: String },

    #[error("invalid environment variable {name}={value:?} (expected a boolean: 1/0, true/false, yes/no, on/off)")]
    Env { name: &'static str, value: String },

    #[error("inconsistent link config: {0}")]
    Inconsistent(String),
}

pub fn parse_link_config_file(path: &Path, bytes: &[u8]) -> Result<LinkConfigOverrides, ConfigError> {
    let file: LinkConfigFile = serde_json::from_slice(bytes).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    if file.schema_version.trim() != NBRIDGE_LINK_CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::SchemaVersion {
            path: path.to_path_buf(),
            found: file.schema_version,
        });
    }
    Ok(LinkConfigOverrides {
        multithreading: file.multithreading,
        virtual_threads: file.virtual_threads,
        continuations: file.continuations,
        check_features: file.check_features,
    })
}

fn read_link_config_file(path: &Path) -> Result<LinkConfigOverrides, ConfigError> {
    let bytes = std::fs::read(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_link_config_file(path, &bytes)
}

fn parse_bool_env(name: &'static str, raw: &str) -> Result<bool, ConfigError> {
    let value = raw.trim();
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Ok(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Ok(false),
        _ => Err(ConfigError::Env {
            name,
            value: value.to_string(),
        }),
    }
}

fn read_bool_env(name: &'static str) -> Result<Option<bool>, ConfigError> {
    let Ok(raw) = std::env::var(name) else {
        return Ok(None);
    };
    Ok(Some(parse_bool_env(name, &raw)?))
}

fn read_env_overrides() -> Result<LinkConfigOverrides, ConfigError> {
    Ok(LinkConfigOverrides {
        multithreading: read_bool_env(ENV_MULTITHREADING)?,
        virtual_threads: read_bool_env(ENV_VIRTUAL_THREADS)?,
        continuations: read_bool_env(ENV_CONTINUATIONS)?,
        check_features: read_bool_env(ENV_CHECK_FEATURES)?,
    })
}

fn resolve_link_config_with_env(
    file: Option<&LinkConfigOverrides>,
    env: &LinkConfigOverrides,
    cli: &LinkConfigOverrides,
) -> Result<LinkConfig, ConfigError> {
    let mut config = LinkConfig::compiled();
    if let Some(file) = file {
        config.apply(file);
    }
    config.apply(env);
    config.apply(cli);
    config.validate()?;
    Ok(config)
}

/// Resolves the link configuration from compiled-in defaults, an optional
/// config file, `NBRIDGE_*` environment variables and `cli`, in increasing
/// order of precedence.
pub fn resolve_link_config(
    path: Option<&Path>,
    cli: &LinkConfigOverrides,
) -> Result<LinkConfig, ConfigError> {
    let file = path.map(read_link_config_file).transpose()?;
    let env = read_env_overrides()?;
    let config = resolve_link_config_with_env(file.as_ref(), &env, cli)?;
    tracing::debug!(
        multithreading = config.multithreading,
        virtual_threads = config.virtual_threads,
        continuations = config.continuations,
        check_features = config.check_features,
        "resolved link config"
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn overrides(mt: Option<bool>, vt: Option<bool>, cont: Option<bool>) -> LinkConfigOverrides {
        LinkConfigOverrides {
            multithreading: mt,
            virtual_threads: vt,
            continuations: cont,
            check_features: None,
        }
    }

    #[test]
    fn precedence_is_file_then_env_then_cli() {
        let file = overrides(Some(true), None, Some(true));
        let env = overrides(Some(false), None, None);
        let cli = LinkConfigOverrides::default();
        let config = resolve_link_config_with_env(Some(&file), &env, &cli).unwrap();
        assert!(!config.multithreading);
        assert!(config.continuations);

        let cli = overrides(Some(true), None, None);
        let config = resolve_link_config_with_env(Some(&file), &env, &cli).unwrap();
        assert!(config.multithreading);
        assert!(config.check_features);
    }

    #[test]
    fn virtual_threads_need_continuations_and_threads() {
        let cli = overrides(Some(true), Some(true), Some(false));
        let err = resolve_link_config_with_env(None, &LinkConfigOverrides::default(), &cli)
            .unwrap_err();
        assert!(err.to_string().contains("require continuations"));

        let cli = overrides(Some(false), Some(true), Some(true));
        let err = resolve_link_config_with_env(None, &LinkConfigOverrides::default(), &cli)
            .unwrap_err();
        assert!(err.to_string().contains("require multithreading"));

        let cli = overrides(Some(true), Some(true), Some(true));
        let config =
            resolve_link_config_with_env(None, &LinkConfigOverrides::default(), &cli).unwrap();
        assert_eq!(config.enabled(), Capability::ALL.to_vec());
    }

    #[test]
    fn parse_bool_env_values() {
        assert!(parse_bool_env(ENV_CHECK_FEATURES, "yes").unwrap());
        assert!(!parse_bool_env(ENV_CHECK_FEATURES, " 0 ").unwrap());
        for raw in ["on", "True", "YES", "y", "T"] {
            assert!(parse_bool_env(ENV_CHECK_FEATURES, raw).unwrap(), "{raw}");
        }
        for raw in ["off", "False", "No", "n", "F"] {
            assert!(!parse_bool_env(ENV_CHECK_FEATURES, raw).unwrap(), "{raw}");
        }
        let err = parse_bool_env(ENV_CHECK_FEATURES, "maybe").unwrap_err();
        assert!(err.to_string().contains("NBRIDGE_CHECK_FEATURES=\"maybe\""));
    }

    #[test]
    fn config_file_requires_pinned_schema() {
        let path = Path::new("link.json");
        let ok = format!(
            r#"{{"schema_version":"{NBRIDGE_LINK_CONFIG_SCHEMA_VERSION}","multithreading":true,"check_features":false}}"#
        );
        let values = parse_link_config_file(path, ok.as_bytes()).unwrap();
        assert_eq!(values.multithreading, Some(true));
        assert_eq!(values.check_features, Some(false));
        assert_eq!(values.continuations, None);

        let bad = r#"{"schema_version":"nbridge.link-config@9.9.9"}"#;
        assert!(matches!(
            parse_link_config_file(path, bad.as_bytes()),
            Err(ConfigError::SchemaVersion { .. })
        ));

        let unknown = format!(
            r#"{{"schema_version":"{NBRIDGE_LINK_CONFIG_SCHEMA_VERSION}","gc":"immix"}}"#
        );
        assert!(matches!(
            parse_link_config_file(path, unknown.as_bytes()),
            Err(ConfigError::Parse { .. })
        ));
    }
}
