//! Définition et implémentation des commandes CLI
//!
//! - `epci` : calcul d'un EPCI (surcharges optionnelles, zone optionnelle)
//! - `zo` : calcul d'une zone
//! - `region` : calcul de tous les territoires d'un pack
//! - `territoires` : liste des codes d'un pack

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use futures::stream;
use futures::StreamExt;
use tracing::{debug, info, warn};

use otelo::{
    CustomParam, DataBackend, Epci, EpciResultat, IndicatorStore, MemoryBackend, Parametres,
    SchemaVersion, ZoResultat, ZoneOtelo,
};
use otelo_pg::backend::{create_pool, sql, test_connection, DatabaseConfig, PgBackend};
use otelo_pg::config;
use otelo_pg::report::{Niveau, RapportBesoins};

/// Connexion PostgreSQL (surcharge l'environnement)
#[derive(Args, Debug, Clone, Default)]
pub struct DatabaseArgs {
    /// PostgreSQL host (défaut : env OTELO_DB_HOST / PGHOST / localhost)
    #[arg(long)]
    pub host: Option<String>,

    /// PostgreSQL database name (défaut : env OTELO_DB_DATABASE / PGDATABASE / otelo)
    #[arg(long)]
    pub database: Option<String>,

    /// PostgreSQL user (défaut : env OTELO_DB_USER / PGUSER / postgres)
    #[arg(long)]
    pub user: Option<String>,

    /// PostgreSQL password (défaut : env OTELO_DB_PASSWORD / PGPASSWORD)
    #[arg(long)]
    pub password: Option<String>,

    /// PostgreSQL port (défaut : env OTELO_DB_PORT / PGPORT / 5432)
    #[arg(long)]
    pub port: Option<u16>,

    /// SSL mode: disable, prefer, require (défaut : env PGSSLMODE / disable)
    #[arg(long)]
    pub ssl: Option<String>,
}

/// Pack de données interrogé
#[derive(Args, Debug, Clone)]
pub struct PackArgs {
    /// Regional pack code (two digits, e.g. 24)
    #[arg(short, long)]
    pub region: String,

    /// Pack schema version: 1 (public) or 2 (v2024)
    #[arg(long = "schema", default_value_t = 2)]
    pub version: u8,

    /// Read the pack from a JSON fixture instead of PostgreSQL
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    #[command(flatten)]
    pub db: DatabaseArgs,
}

/// Options communes aux commandes de calcul
#[derive(Args, Debug, Clone)]
pub struct CalculArgs {
    #[command(flatten)]
    pub pack: PackArgs,

    /// Projection horizon in years
    #[arg(long, default_value_t = otelo::PERIODE_PROJECTION_DEFAUT)]
    pub periode: u32,

    /// Parameter preset (standard/defaut/filocom) or path to a JSON file
    #[arg(short, long, default_value = "standard")]
    pub parametres: String,

    /// Save the report as JSON
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compute the housing need of one EPCI
    Epci {
        /// EPCI code (SIREN)
        code: String,

        #[command(flatten)]
        calcul: CalculArgs,

        /// Code of the containing zone, also computed
        #[arg(long)]
        zone: Option<String>,

        /// Custom annual demographic evolution (households per year)
        #[arg(long)]
        evol_demo: Option<i64>,

        /// Custom annual restructuring rate (%)
        #[arg(long)]
        tx_restructuration: Option<f64>,

        /// Custom annual disappearance rate (%)
        #[arg(long)]
        tx_disparition: Option<f64>,

        /// Custom vacancy rate (%)
        #[arg(long)]
        tx_lv: Option<f64>,

        /// Custom secondary residence rate (%)
        #[arg(long)]
        tx_rs: Option<f64>,
    },

    /// Compute the housing need of one zone
    Zo {
        /// Zone code
        code: String,

        #[command(flatten)]
        calcul: CalculArgs,
    },

    /// Compute every EPCI and zone of a regional pack
    Region {
        #[command(flatten)]
        calcul: CalculArgs,

        /// Maximum number of territories computed concurrently
        #[arg(long, alias = "threads")]
        jobs: Option<usize>,

        /// JSON file of per-EPCI custom parameters
        #[arg(long)]
        custom: Option<PathBuf>,

        /// Skip zones
        #[arg(long)]
        no_zones: bool,
    },

    /// List EPCI and zone codes of a regional pack
    Territoires {
        #[command(flatten)]
        pack: PackArgs,
    },
}

/// Vérifie le code région et la version du pack
fn validate_pack(pack: &PackArgs) -> Result<SchemaVersion> {
    if !sql::is_valid_region(&pack.region) {
        anyhow::bail!(
            "Invalid region code: {}. Expected two digits (e.g. 24)",
            pack.region
        );
    }
    Ok(SchemaVersion::try_from(pack.version)?)
}

/// Ouvre le backend : fixture JSON ou PostgreSQL
pub async fn open_backend(pack: &PackArgs) -> Result<Arc<dyn DataBackend>> {
    if let Some(path) = &pack.fixture {
        let backend = MemoryBackend::load(path)
            .context(format!("Failed to load fixture: {}", path.display()))?;
        println!("Fixture: {}", path.display());
        return Ok(Arc::new(backend));
    }

    let mut db_config = DatabaseConfig::from_env();
    let db = pack.db.clone();
    apply_database_overrides(
        &mut db_config,
        db.host,
        db.database,
        db.user,
        db.password,
        db.port,
        db.ssl,
    );
    println!(
        "Database: {}@{}:{}/{} (SSL: {:?})",
        db_config.user, db_config.host, db_config.port, db_config.dbname, db_config.ssl_mode
    );

    let pool = create_pool(&db_config).await?;
    test_connection(&pool).await?;
    info!("Connected to PostgreSQL");

    Ok(Arc::new(PgBackend::new(pool)))
}

fn load_parametres(spec: &str) -> Result<Arc<Parametres>> {
    let parametre = config::load_parametres(spec)?;
    info!(parametre = %parametre, "Parameters loaded");
    Ok(Arc::new(parametre))
}

fn finish(mut rapport: RapportBesoins, start: Instant, output: Option<&Path>) -> Result<()> {
    rapport.set_duration(start.elapsed());
    rapport.finalize();
    rapport.display();

    if let Some(path) = output {
        rapport.save_to_file(path)?;
        println!("Report saved to {}", path.display());
    }

    info!("{}", rapport.summary());
    Ok(())
}

/// Exécute la commande epci
#[allow(clippy::too_many_arguments)]
pub async fn cmd_epci(
    code: &str,
    calcul: &CalculArgs,
    zone: Option<&str>,
    evol_demo: Option<i64>,
    tx_restructuration: Option<f64>,
    tx_disparition: Option<f64>,
    tx_lv: Option<f64>,
    tx_rs: Option<f64>,
) -> Result<()> {
    let start = Instant::now();
    let version = validate_pack(&calcul.pack)?;
    let parametre = load_parametres(&calcul.parametres)?;
    let backend = open_backend(&calcul.pack).await?;
    let region = calcul.pack.region.as_str();

    let custom = CustomParam {
        b2_evol_demo_an: evol_demo,
        b2_tx_restructuration_custom: tx_restructuration,
        b2_tx_disparition_custom: tx_disparition,
        b2_tx_rs_custom: tx_rs,
        b2_tx_lv_custom: tx_lv,
    };

    let mut epci = Epci::new(code, region, version, Arc::clone(&parametre)).with_custom_param(custom);
    if let Some(zone) = zone {
        let zo = ZoneOtelo::new(zone, region, version, Arc::clone(&parametre));
        epci = epci.with_zone(Arc::new(zo));
    }

    let resultat = EpciResultat::new(&epci, Arc::clone(&backend), calcul.periode);
    let mut rapport = RapportBesoins::new(
        region,
        version,
        &parametre.nom,
        calcul.periode,
        backend.backend_tag(),
    );

    if !resultat.data().is_epci_level(otelo::Source::SaRp, code).await {
        warn!(code, "Code not found among the EPCIs of the pack");
        rapport.record_warning(code, "Code not found among the EPCIs of the pack");
    }

    info!(code, "Computing EPCI");
    rapport.record(Niveau::Epci, resultat.synthese().await);

    if let Some(zo) = resultat.zone_resultat() {
        info!(code = zo.code(), "Computing containing zone");
        rapport.record(Niveau::Zone, zo.synthese().await);
    }

    finish(rapport, start, calcul.output.as_deref())
}

/// Exécute la commande zo
pub async fn cmd_zo(code: &str, calcul: &CalculArgs) -> Result<()> {
    let start = Instant::now();
    let version = validate_pack(&calcul.pack)?;
    let parametre = load_parametres(&calcul.parametres)?;
    let backend = open_backend(&calcul.pack).await?;
    let region = calcul.pack.region.as_str();

    let zo = ZoneOtelo::new(code, region, version, Arc::clone(&parametre));
    let resultat = ZoResultat::new(&zo, Arc::clone(&backend), calcul.periode);

    let mut rapport = RapportBesoins::new(
        region,
        version,
        &parametre.nom,
        calcul.periode,
        backend.backend_tag(),
    );
    info!(code, "Computing zone");
    rapport.record(Niveau::Zone, resultat.synthese().await);

    finish(rapport, start, calcul.output.as_deref())
}

/// Exécute la commande region
pub async fn cmd_region(
    calcul: &CalculArgs,
    jobs: Option<usize>,
    custom_path: Option<&Path>,
    no_zones: bool,
) -> Result<()> {
    let start = Instant::now();
    let version = validate_pack(&calcul.pack)?;
    let parametre = load_parametres(&calcul.parametres)?;
    let backend = open_backend(&calcul.pack).await?;
    let region = calcul.pack.region.clone();

    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4)
    });

    let mut customs = match custom_path {
        Some(path) => config::load_custom_params(path)?,
        None => Default::default(),
    };

    let listing = IndicatorStore::new(Arc::clone(&backend), region.as_str(), version);
    let epcis = listing.epcis().await;
    let zos = if no_zones { Vec::new() } else { listing.zos().await };

    if epcis.is_empty() && zos.is_empty() {
        anyhow::bail!("No territory found in regional pack {} (v{})", region, version);
    }

    let mut rapport = RapportBesoins::new(
        &region,
        version,
        &parametre.nom,
        calcul.periode,
        backend.backend_tag(),
    );

    let mut inconnus: Vec<String> = customs
        .keys()
        .filter(|code| !epcis.contains(*code))
        .cloned()
        .collect();
    inconnus.sort();
    for code in inconnus {
        warn!(code = %code, "Custom parameters for unknown EPCI ignored");
        rapport.record_warning(&code, "Custom parameters for unknown EPCI ignored");
        customs.remove(&code);
    }

    println!("=== Région {} (v{}) ===", region, version);
    println!("Parameters: {}", parametre);
    println!("Horizon: {} years", calcul.periode);
    println!("EPCI: {}, zones: {}", epcis.len(), zos.len());
    println!("Custom EPCI: {}", customs.len());
    println!("Jobs: {}", jobs);

    let territoires: Vec<(Niveau, String)> = epcis
        .into_iter()
        .map(|code| (Niveau::Epci, code))
        .chain(zos.into_iter().map(|code| (Niveau::Zone, code)))
        .collect();
    let total = territoires.len();

    let processed = Arc::new(AtomicUsize::new(0));
    let lignes = Arc::new(Mutex::new(Vec::with_capacity(total)));
    let customs = Arc::new(customs);

    stream::iter(territoires)
        .for_each_concurrent(jobs, |(niveau, code)| {
            let backend = Arc::clone(&backend);
            let parametre = Arc::clone(&parametre);
            let customs = Arc::clone(&customs);
            let processed = Arc::clone(&processed);
            let lignes = Arc::clone(&lignes);
            let region = region.clone();
            let periode = calcul.periode;

            async move {
                // Un store par territoire
                let synthese = match niveau {
                    Niveau::Epci => {
                        let mut epci = Epci::new(code.as_str(), region.as_str(), version, parametre);
                        if let Some(custom) = customs.get(&code) {
                            epci = epci.with_custom_param(custom.clone());
                        }
                        EpciResultat::new(&epci, backend, periode).synthese().await
                    }
                    Niveau::Zone => {
                        let zo = ZoneOtelo::new(code.as_str(), region.as_str(), version, parametre);
                        ZoResultat::new(&zo, backend, periode).synthese().await
                    }
                };

                debug!(code = %code, besoin_total = synthese.besoin_total, "Territory computed");
                lignes
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push((niveau, synthese));

                let done = processed.fetch_add(1, Ordering::Relaxed) + 1;
                if done % 10 == 0 || done == total {
                    info!("Progress: {}/{} territories", done, total);
                }
            }
        })
        .await;

    let lignes = std::mem::take(&mut *lignes.lock().unwrap_or_else(|e| e.into_inner()));
    for (niveau, synthese) in lignes {
        rapport.record(niveau, synthese);
    }

    finish(rapport, start, calcul.output.as_deref())
}

/// Exécute la commande territoires
pub async fn cmd_territoires(pack: &PackArgs) -> Result<()> {
    let version = validate_pack(pack)?;
    let backend = open_backend(pack).await?;
    let store = IndicatorStore::new(backend, pack.region.as_str(), version);

    let epcis = store.epcis().await;
    let zos = store.zos().await;

    println!("=== Région {} (v{}) ===", pack.region, version);
    println!("\nEPCI ({}):", epcis.len());
    for code in &epcis {
        let marque = if store.epci_moins_50k(code).await {
            " (< 50 000 hab.)"
        } else {
            ""
        };
        println!("  {}{}", code, marque);
    }
    println!("\nZones ({}):", zos.len());
    for code in &zos {
        println!("  {}", code);
    }

    Ok(())
}

fn apply_database_overrides(
    config: &mut DatabaseConfig,
    host: Option<String>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
    port: Option<u16>,
    ssl: Option<String>,
) {
    if let Some(host) = host {
        config.host = host;
    }
    if let Some(database) = database {
        config.dbname = database;
    }
    if let Some(user) = user {
        config.user = user;
    }
    if let Some(password) = password {
        config.password = Some(password);
    }
    if let Some(port) = port {
        config.port = port;
    }
    if let Some(ssl) = ssl {
        match ssl.parse() {
            Ok(mode) => config.ssl_mode = mode,
            Err(e) => warn!("{}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otelo_pg::backend::SslMode;

    fn pack(region: &str, version: u8) -> PackArgs {
        PackArgs {
            region: region.to_string(),
            version,
            fixture: None,
            db: DatabaseArgs::default(),
        }
    }

    #[test]
    fn test_validate_pack() {
        assert_eq!(validate_pack(&pack("24", 2)).unwrap(), SchemaVersion::V2024);
        assert_eq!(validate_pack(&pack("11", 1)).unwrap(), SchemaVersion::Legacy);
        assert!(validate_pack(&pack("2", 2)).is_err());
        assert!(validate_pack(&pack("24", 3)).is_err());
    }

    #[test]
    fn test_apply_database_overrides() {
        let mut config = DatabaseConfig::default();
        apply_database_overrides(
            &mut config,
            Some("db.local".into()),
            None,
            Some("otelo".into()),
            Some("secret".into()),
            Some(5433),
            Some("require".into()),
        );
        assert_eq!(config.host, "db.local");
        assert_eq!(config.dbname, "otelo");
        assert_eq!(config.user, "otelo");
        assert_eq!(config.password.as_deref(), Some("secret"));
        assert_eq!(config.port, 5433);
        assert_eq!(config.ssl_mode, SslMode::Require);

        apply_database_overrides(&mut config, None, None, None, None, None, Some("bogus".into()));
        assert_eq!(config.ssl_mode, SslMode::Require);
    }

    #[tokio::test]
    async fn test_open_backend_from_fixture() {
        let mut args = pack("24", 2);
        args.fixture = Some(
            Path::new(env!("CARGO_MANIFEST_DIR")).join("../otelo/tests/fixtures/region24.json"),
        );
        let backend = open_backend(&args).await.unwrap();
        assert_eq!(backend.backend_tag(), "memory");

        let store = IndicatorStore::new(backend, "24", SchemaVersion::V2024);
        assert_eq!(store.epcis().await.len(), 2);
    }
}
