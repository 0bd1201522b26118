//! Connection settings for the PostgreSQL backend.

use std::env;
use std::time::Duration;

/// Where and how to connect to PostgreSQL.
///
/// The URL comes from `PLANNER_DATABASE_URL` when set, otherwise
/// `postgresql://localhost:5432/planner`. Pool sizing defaults suit a
/// single CLI process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL, optionally with a `?query` suffix.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/planner";

    /// Environment variable consulted by [`DbConfig::from_env`].
    pub const ENV_VAR: &str = "PLANNER_DATABASE_URL";

    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn from_env() -> Self {
        Self::new(env::var(Self::ENV_VAR).unwrap_or_else(|_| Self::DEFAULT_URL.to_owned()))
    }

    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections;
        self
    }

    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }

    /// Split the URL into `(server, database name, query suffix)`.
    ///
    /// The query suffix keeps its leading `?` so it can be re-appended as is.
    fn parts(&self) -> (&str, Option<&str>, &str) {
        let url = self.database_url.as_str();
        let (body, query) = url.find('?').map_or((url, ""), |i| url.split_at(i));
        let authority = body.find("://").map_or(0, |i| i + 3);
        match body[authority..].find('/') {
            Some(slash) => {
                let at = authority + slash;
                let name = &body[at + 1..];
                (&body[..at], (!name.is_empty()).then_some(name), query)
            }
            None => (body, None, query),
        }
    }

    /// The database named in the URL, or `None` if the URL has no path.
    pub fn database_name(&self) -> Option<&str> {
        self.parts().1
    }

    /// Same server, credentials and options, different database.
    pub fn with_database(&self, name: &str) -> Self {
        let (server, _, query) = self.parts();
        Self {
            database_url: format!("{server}/{name}{query}"),
            ..self.clone()
        }
    }

    /// URL of the `postgres` maintenance database on the same server.
    pub fn maintenance_url(&self) -> String {
        self.with_database("postgres").database_url
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_url_names_planner_database() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_name(), Some("planner"));
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn database_name_missing() {
        assert_eq!(DbConfig::new("postgresql://localhost:5432/").database_name(), None);
        assert_eq!(DbConfig::new("postgresql://localhost:5432").database_name(), None);
    }

    #[test]
    fn query_suffix_is_not_part_of_the_name() {
        let cfg = DbConfig::new("postgresql://u:p@db.internal:5432/checklists?sslmode=require");
        assert_eq!(cfg.database_name(), Some("checklists"));
        assert_eq!(
            cfg.maintenance_url(),
            "postgresql://u:p@db.internal:5432/postgres?sslmode=require"
        );
    }

    #[test]
    fn with_database_keeps_pool_settings() {
        let cfg = DbConfig::new("postgresql://localhost:5432/planner")
            .with_max_connections(1)
            .with_acquire_timeout(Duration::from_secs(30));
        let other = cfg.with_database("planner_test_1");
        assert_eq!(other.database_url, "postgresql://localhost:5432/planner_test_1");
        assert_eq!(other.max_connections, 1);
        assert_eq!(other.acquire_timeout, Duration::from_secs(30));
    }
}
