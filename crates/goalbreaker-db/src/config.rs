use std::env;

/// Environment variable holding the connection URL.
pub const DATABASE_URL_ENV: &str = "GOALBREAKER_DATABASE_URL";

/// Generic fallback variable, honoured when [`DATABASE_URL_ENV`] is unset.
pub const FALLBACK_DATABASE_URL_ENV: &str = "DATABASE_URL";

/// Database configuration.
///
/// There is no built-in default URL: the service refuses to start without one.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
}

impl DbConfig {
    /// Build a config from the environment.
    ///
    /// Priority: `GOALBREAKER_DATABASE_URL`, then `DATABASE_URL`. Returns
    /// `None` when neither is set (or both are empty).
    pub fn from_env() -> Option<Self> {
        [DATABASE_URL_ENV, FALLBACK_DATABASE_URL_ENV]
            .iter()
            .filter_map(|key| env::var(key).ok())
            .find(|url| !url.trim().is_empty())
            .map(Self::new)
    }

    /// Build a config from an explicit URL (useful for tests and CLI flags).
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    /// Extract the database name from the URL.
    ///
    /// Query parameters are ignored. Returns `None` if the URL has no path
    /// component.
    pub fn database_name(&self) -> Option<&str> {
        // URLs look like: postgresql://host:port/dbname?sslmode=require
        let without_query = self
            .database_url
            .split('?')
            .next()
            .unwrap_or(&self.database_url);
        let (authority, name) = without_query.rsplit_once('/')?;
        if authority.ends_with('/') || name.is_empty() {
            return None;
        }
        Some(name)
    }

    /// Return a URL pointing at the `postgres` maintenance database on the
    /// same host. Used to issue `CREATE DATABASE` when the target DB does not
    /// yet exist.
    pub fn maintenance_url(&self) -> String {
        let (base, query) = match self.database_url.split_once('?') {
            Some((base, query)) => (base, Some(query)),
            None => (self.database_url.as_str(), None),
        };
        let mut url = match base.rfind('/') {
            Some(pos) => format!("{}/postgres", &base[..pos]),
            None => return self.database_url.clone(),
        };
        if let Some(query) = query {
            url.push('?');
            url.push_str(query);
        }
        url
    }
}
