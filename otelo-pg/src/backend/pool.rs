//! Pool de connexions PostgreSQL
//!
//! Taille du pool et délais viennent de [`DatabaseConfig`], elle-même lue
//! dans l'environnement. Un délai à 0 seconde désactive la limite.

use anyhow::{Context, Result};
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime, Timeouts};
use std::time::Duration;
use tokio_postgres::NoTls;
use tokio_postgres_rustls::MakeRustlsConnect;

/// Mode SSL pour la connexion PostgreSQL
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SslMode {
    /// Pas de SSL (défaut)
    #[default]
    Disable,
    /// SSL préféré mais non requis
    Prefer,
    /// SSL requis
    Require,
}

impl SslMode {
    fn to_pg(self) -> deadpool_postgres::SslMode {
        match self {
            SslMode::Disable => deadpool_postgres::SslMode::Disable,
            SslMode::Prefer => deadpool_postgres::SslMode::Prefer,
            SslMode::Require => deadpool_postgres::SslMode::Require,
        }
    }
}

impl std::str::FromStr for SslMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "disable" | "off" | "false" | "no" => Ok(SslMode::Disable),
            "prefer" => Ok(SslMode::Prefer),
            "require" | "on" | "true" | "yes" => Ok(SslMode::Require),
            _ => Err(format!("Invalid SSL mode: {}. Use: disable, prefer, require", s)),
        }
    }
}

/// Délais du pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolTimeouts {
    /// Attente d'une connexion libre (`OTELO_POOL_WAIT_SECS`)
    pub wait: Option<Duration>,
    /// Ouverture d'une connexion (`OTELO_POOL_CREATE_SECS`, puis `PGCONNECT_TIMEOUT`)
    pub create: Option<Duration>,
    /// Vérification d'une connexion rendue au pool (`OTELO_POOL_RECYCLE_SECS`)
    pub recycle: Option<Duration>,
}

impl Default for PoolTimeouts {
    fn default() -> Self {
        Self {
            wait: Some(Duration::from_secs(30)),
            create: Some(Duration::from_secs(10)),
            recycle: Some(Duration::from_secs(30)),
        }
    }
}

/// Configuration de la base de données
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: Option<String>,
    pub pool_size: usize,
    pub ssl_mode: SslMode,
    pub timeouts: PoolTimeouts,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 5432,
            dbname: "otelo".into(),
            user: "postgres".into(),
            password: None,
            pool_size: 8,
            ssl_mode: SslMode::Disable,
            timeouts: PoolTimeouts::default(),
        }
    }
}

/// Délai en secondes ; 0 désactive la limite, une valeur illisible garde le défaut
fn parse_timeout(value: Option<String>, default: Option<Duration>) -> Option<Duration> {
    match value.and_then(|s| s.trim().parse::<u64>().ok()) {
        Some(0) => None,
        Some(secs) => Some(Duration::from_secs(secs)),
        None => default,
    }
}

impl DatabaseConfig {
    /// Charge la configuration depuis les variables d'environnement
    ///
    /// Les variables `OTELO_DB_*` sont prioritaires sur les variables libpq
    /// (`PGHOST`, `PGPORT`...).
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Charge la configuration depuis une fonction de lecture de variables
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |primary: &str, fallback: &str| lookup(primary).or_else(|| lookup(fallback));
        let defaults = Self::default();

        let timeouts = PoolTimeouts {
            wait: parse_timeout(lookup("OTELO_POOL_WAIT_SECS"), defaults.timeouts.wait),
            create: parse_timeout(
                var("OTELO_POOL_CREATE_SECS", "PGCONNECT_TIMEOUT"),
                defaults.timeouts.create,
            ),
            recycle: parse_timeout(lookup("OTELO_POOL_RECYCLE_SECS"), defaults.timeouts.recycle),
        };

        Self {
            host: var("OTELO_DB_HOST", "PGHOST").unwrap_or(defaults.host),
            port: var("OTELO_DB_PORT", "PGPORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            dbname: var("OTELO_DB_DATABASE", "PGDATABASE").unwrap_or(defaults.dbname),
            user: var("OTELO_DB_USER", "PGUSER").unwrap_or(defaults.user),
            password: var("OTELO_DB_PASSWORD", "PGPASSWORD"),
            pool_size: lookup("POOL_SIZE")
                .and_then(|s| s.parse().ok())
                .filter(|&n: &usize| n > 0)
                .unwrap_or(defaults.pool_size),
            ssl_mode: lookup("PGSSLMODE")
                .and_then(|s| s.parse().ok())
                .unwrap_or_default(),
            timeouts,
        }
    }

    /// Configuration deadpool correspondante
    ///
    /// Le délai d'ouverture sert aussi de `connect_timeout` côté libpq.
    pub fn pool_config(&self) -> Config {
        let mut cfg = Config::new();
        cfg.host = Some(self.host.clone());
        cfg.port = Some(self.port);
        cfg.dbname = Some(self.dbname.clone());
        cfg.user = Some(self.user.clone());
        cfg.password = self.password.clone();
        cfg.ssl_mode = Some(self.ssl_mode.to_pg());
        cfg.connect_timeout = self.timeouts.create;

        let mut pool = PoolConfig::new(self.pool_size.max(1));
        pool.timeouts = Timeouts {
            wait: self.timeouts.wait,
            create: self.timeouts.create,
            recycle: self.timeouts.recycle,
        };
        cfg.pool = Some(pool);
        cfg
    }
}

/// Connecteur TLS sur les racines webpki
fn make_tls_connector() -> MakeRustlsConnect {
    let roots = rustls::RootCertStore::from_iter(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    MakeRustlsConnect::new(
        rustls::ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth(),
    )
}

/// Crée un pool de connexions
///
/// Aucune connexion n'est ouverte ici : la première arrive avec
/// [`test_connection`] ou la première requête.
pub async fn create_pool(config: &DatabaseConfig) -> Result<Pool> {
    let cfg = config.pool_config();
    let runtime = Some(Runtime::Tokio1);

    match config.ssl_mode {
        SslMode::Disable => cfg
            .create_pool(runtime, NoTls)
            .context("Failed to create database pool"),
        SslMode::Prefer | SslMode::Require => cfg
            .create_pool(runtime, make_tls_connector())
            .context("Failed to create database pool with TLS"),
    }
}

/// Teste la connexion à la base
pub async fn test_connection(pool: &Pool) -> Result<()> {
    let client = pool
        .get()
        .await
        .context("Failed to get connection from pool")?;
    client
        .execute("SELECT 1", &[])
        .await
        .context("Connection test failed")?;
    Ok(())
}
