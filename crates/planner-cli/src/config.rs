//! Configuration file management for planner.
//!
//! Provides a TOML-based config file at `~/.config/planner/config.toml` and a
//! resolution chain: CLI flag > env var > config file > default.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use planner_db::config::DbConfig;

/// Env var selecting the storage backend (`file` or `postgres`).
pub const STORAGE_ENV: &str = "PLANNER_STORAGE";
/// Env var overriding the reference data endpoint.
pub const REFERENCE_ENV: &str = "PLANNER_REFERENCE_URL";

// -----------------------------------------------------------------------
// Config file types
// -----------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub storage: StorageSection,
    #[serde(default)]
    pub database: DatabaseSection,
    #[serde(default)]
    pub reference: ReferenceSection,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct StorageSection {
    #[serde(default)]
    pub backend: Backend,
    /// Directory for the file backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DatabaseSection {
    pub url: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            url: DbConfig::DEFAULT_URL.to_string(),
        }
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ReferenceSection {
    /// Endpoint serving preset heuristics and success factors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Where plan records are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    File,
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => f.write_str("file"),
            Self::Postgres => f.write_str("postgres"),
        }
    }
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "postgres" | "postgresql" => Ok(Self::Postgres),
            other => bail!("invalid storage backend: {other:?} (expected file or postgres)"),
        }
    }
}

// -----------------------------------------------------------------------
// Paths
// -----------------------------------------------------------------------

/// Return the planner config directory.
///
/// Always uses XDG layout: `$XDG_CONFIG_HOME/planner` or `~/.config/planner`.
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join("planner");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("planner")
}

/// Return the path to the planner config file.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default directory for the file backend: `$XDG_DATA_HOME/planner/plans`
/// or `~/.local/share/planner/plans`.
pub fn default_data_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("planner").join("plans");
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".local")
        .join("share")
        .join("planner")
        .join("plans")
}

// -----------------------------------------------------------------------
// Read / write
// -----------------------------------------------------------------------

/// Load and parse the config file. Returns an error if it does not exist.
pub fn load_config() -> Result<ConfigFile> {
    let path = config_path();
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: ConfigFile = toml::from_str(&contents).context("failed to parse config file")?;
    Ok(config)
}

/// Serialize and write the config file, creating parent dirs as needed.
/// Sets file permissions to 0600 on Unix.
pub fn save_config(config: &ConfigFile) -> Result<()> {
    let path = config_path();
    let dir = config_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;

    let contents = toml::to_string_pretty(config).context("failed to serialize config")?;
    std::fs::write(&path, &contents)
        .with_context(|| format!("failed to write config file at {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(&path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

// -----------------------------------------------------------------------
// Resolved config
// -----------------------------------------------------------------------

/// Values given on the command line, if any.
#[derive(Debug, Default)]
pub struct Overrides<'a> {
    pub database_url: Option<&'a str>,
    pub storage: Option<Backend>,
    pub data_dir: Option<&'a std::path::Path>,
}

/// Fully resolved configuration, ready for use.
#[derive(Debug)]
pub struct PlannerConfig {
    pub backend: Backend,
    pub data_dir: PathBuf,
    pub db_config: DbConfig,
    pub reference_url: Option<String>,
}

impl PlannerConfig {
    /// Resolve configuration using the chain: CLI flag > env var > config file > default.
    ///
    /// - Backend: `--storage` > `PLANNER_STORAGE` > `storage.backend` > `file`
    /// - Data dir: `--data-dir` > `storage.data_dir` > [`default_data_dir`]
    /// - DB URL: `--database-url` > `PLANNER_DATABASE_URL` > `database.url` > `DbConfig::DEFAULT_URL`
    /// - Reference URL: `PLANNER_REFERENCE_URL` > `reference.url` > none (embedded defaults)
    pub fn resolve(overrides: &Overrides<'_>) -> Result<Self> {
        let file_config = load_config().ok();

        let backend = if let Some(backend) = overrides.storage {
            backend
        } else if let Ok(value) = std::env::var(STORAGE_ENV) {
            value
                .parse()
                .with_context(|| format!("{STORAGE_ENV} env var is invalid"))?
        } else if let Some(ref cfg) = file_config {
            cfg.storage.backend
        } else {
            Backend::default()
        };

        let data_dir = if let Some(dir) = overrides.data_dir {
            dir.to_path_buf()
        } else if let Some(dir) = file_config.as_ref().and_then(|c| c.storage.data_dir.clone()) {
            dir
        } else {
            default_data_dir()
        };

        let db_url = if let Some(url) = overrides.database_url {
            url.to_string()
        } else if let Ok(url) = std::env::var(DbConfig::ENV_VAR) {
            url
        } else if let Some(ref cfg) = file_config {
            cfg.database.url.clone()
        } else {
            DbConfig::DEFAULT_URL.to_string()
        };

        let reference_url = std::env::var(REFERENCE_ENV)
            .ok()
            .or_else(|| file_config.and_then(|c| c.reference.url));

        Ok(Self {
            backend,
            data_dir,
            db_config: DbConfig::new(db_url),
            reference_url,
        })
    }
}

// -----------------------------------------------------------------------
// Tests
// -----------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn lock_env() -> std::sync::MutexGuard<'static, ()> {
        crate::test_util::lock_env()
    }

    /// Point config and data lookups at an empty temp dir for the test.
    struct IsolatedEnv {
        _tmp: tempfile::TempDir,
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl IsolatedEnv {
        fn new() -> Self {
            let tmp = tempfile::TempDir::new().unwrap();
            let vars = [
                "XDG_CONFIG_HOME",
                "XDG_DATA_HOME",
                STORAGE_ENV,
                REFERENCE_ENV,
                DbConfig::ENV_VAR,
            ];
            let saved = vars.iter().map(|v| (*v, std::env::var(v).ok())).collect();
            for var in vars {
                unsafe { std::env::remove_var(var) };
            }
            unsafe { std::env::set_var("XDG_CONFIG_HOME", tmp.path().join("config")) };
            unsafe { std::env::set_var("XDG_DATA_HOME", tmp.path().join("data")) };
            Self { _tmp: tmp, saved }
        }
    }

    impl Drop for IsolatedEnv {
        fn drop(&mut self) {
            for (var, value) in &self.saved {
                match value {
                    Some(v) => unsafe { std::env::set_var(var, v) },
                    None => unsafe { std::env::remove_var(var) },
                }
            }
        }
    }

    #[test]
    fn save_and_load_config_roundtrip() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        let original = ConfigFile {
            storage: StorageSection {
                backend: Backend::Postgres,
                data_dir: Some(PathBuf::from("/srv/plans")),
            },
            database: DatabaseSection {
                url: "postgresql://testhost:5432/testdb".to_string(),
            },
            reference: ReferenceSection {
                url: Some("https://reference.example/tcof".to_string()),
            },
        };
        save_config(&original).unwrap();

        let loaded = load_config().unwrap();
        assert_eq!(loaded.storage.backend, Backend::Postgres);
        assert_eq!(loaded.storage.data_dir, original.storage.data_dir);
        assert_eq!(loaded.database.url, original.database.url);
        assert_eq!(loaded.reference.url, original.reference.url);
    }

    #[cfg(unix)]
    #[test]
    fn save_config_sets_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        save_config(&ConfigFile::default()).unwrap();
        let meta = std::fs::metadata(config_path()).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[test]
    fn partial_config_file_uses_defaults() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        std::fs::create_dir_all(config_dir()).unwrap();
        std::fs::write(config_path(), "[reference]\nurl = \"http://ref.local\"\n").unwrap();

        let resolved = PlannerConfig::resolve(&Overrides::default()).unwrap();
        assert_eq!(resolved.backend, Backend::File);
        assert_eq!(resolved.db_config.database_url, DbConfig::DEFAULT_URL);
        assert_eq!(resolved.reference_url.as_deref(), Some("http://ref.local"));
    }

    #[test]
    fn resolve_defaults_when_nothing_set() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        let resolved = PlannerConfig::resolve(&Overrides::default()).unwrap();
        assert_eq!(resolved.backend, Backend::File);
        assert_eq!(resolved.data_dir, default_data_dir());
        assert!(resolved.data_dir.ends_with("planner/plans"));
        assert_eq!(resolved.db_config.database_url, DbConfig::DEFAULT_URL);
        assert!(resolved.reference_url.is_none());
    }

    #[test]
    fn resolve_with_cli_flags_overrides_all() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(STORAGE_ENV, "file") };

        let overrides = Overrides {
            database_url: Some("postgresql://cli:5432/clidb"),
            storage: Some(Backend::Postgres),
            data_dir: None,
        };
        let resolved = PlannerConfig::resolve(&overrides).unwrap();
        assert_eq!(resolved.db_config.database_url, "postgresql://cli:5432/clidb");
        assert_eq!(resolved.backend, Backend::Postgres);
    }

    #[test]
    fn resolve_with_env_vars_overrides_config_file() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        save_config(&ConfigFile {
            storage: StorageSection {
                backend: Backend::File,
                data_dir: None,
            },
            database: DatabaseSection {
                url: "postgresql://file:5432/filedb".to_string(),
            },
            reference: ReferenceSection::default(),
        })
        .unwrap();
        unsafe { std::env::set_var(DbConfig::ENV_VAR, "postgresql://env:5432/envdb") };
        unsafe { std::env::set_var(STORAGE_ENV, "postgres") };
        unsafe { std::env::set_var(REFERENCE_ENV, "http://env-ref") };

        let resolved = PlannerConfig::resolve(&Overrides::default()).unwrap();
        assert_eq!(resolved.db_config.database_url, "postgresql://env:5432/envdb");
        assert_eq!(resolved.backend, Backend::Postgres);
        assert_eq!(resolved.reference_url.as_deref(), Some("http://env-ref"));
    }

    #[test]
    fn invalid_storage_env_is_an_error() {
        let _lock = lock_env();
        let _env = IsolatedEnv::new();

        unsafe { std::env::set_var(STORAGE_ENV, "redis") };
        let err = PlannerConfig::resolve(&Overrides::default()).unwrap_err();
        assert!(format!("{err:#}").contains("redis"), "unexpected error: {err:#}");
    }

    #[test]
    fn backend_parses_case_insensitively() {
        assert_eq!("File".parse::<Backend>().unwrap(), Backend::File);
        assert_eq!("POSTGRESQL".parse::<Backend>().unwrap(), Backend::Postgres);
        assert!("sqlite".parse::<Backend>().is_err());
    }

    #[test]
    fn config_path_ends_with_expected_filename() {
        let path = config_path();
        assert!(
            path.ends_with("planner/config.toml"),
            "unexpected config path: {}",
            path.display()
        );
    }
}
