//! Tests d'intégration PostgreSQL
//!
//! Ces tests nécessitent une base PostgreSQL disponible.
//! Configuration via variables d'environnement:
//! - PGHOST, PGPORT, PGUSER, PGPASSWORD, PGDATABASE
//!
//! Exécution:
//! ```bash
//! # Avec PostgreSQL local
//! cargo test --test postgres_integration -- --ignored
//!
//! # Avec Docker
//! docker run -d --name postgres-test -e POSTGRES_PASSWORD=test -p 5432:5432 postgres
//! PGPASSWORD=test cargo test --test postgres_integration -- --ignored
//! ```

use std::sync::Arc;

use anyhow::Result;
use deadpool_postgres::Pool;

use otelo::{
    BackendError, DataBackend, Epci, EpciResultat, Granularity, Parametres, SchemaVersion,
    Source, TableId,
};
use otelo_pg::backend::{create_pool, DatabaseConfig, PgBackend, RetryPolicy};

const REGION: &str = "99";
const EPCI: &str = "200000001";
const EPCI_NULL: &str = "200000002";

fn test_config() -> DatabaseConfig {
    let mut config = DatabaseConfig::from_env();
    if std::env::var("PGDATABASE").is_err() && std::env::var("OTELO_DB_DATABASE").is_err() {
        config.dbname = "otelo_test".into();
    }
    config.pool_size = 4;
    config
}

fn table(source: Source) -> TableId {
    source.table(REGION, SchemaVersion::V2024, Granularity::Epci)
}

/// Crée un mini pack régional dans le schéma v2024
async fn setup_test_pack(pool: &Pool) -> Result<()> {
    let client = pool.get().await?;

    client
        .batch_execute(
            r#"
            CREATE SCHEMA IF NOT EXISTS v2024;

            DROP TABLE IF EXISTS v2024.r99_fb1_sa_rp;
            DROP TABLE IF EXISTS v2024.r99_fb1_sa_rp_zo;
            DROP TABLE IF EXISTS v2024.r99_fb1_mv_qualite_rp;
            DROP TABLE IF EXISTS v2024.r99_fb2_flux_filo;
            DROP TABLE IF EXISTS v2024.r99_fb2_omphale;

            CREATE TABLE v2024.r99_fb1_sa_rp (
                code_epci TEXT,
                nb_pers DOUBLE PRECISION
            );
            INSERT INTO v2024.r99_fb1_sa_rp VALUES
                ('200000001', 120),
                ('200000002', NULL);

            CREATE TABLE v2024.r99_fb1_sa_rp_zo (
                code_zo TEXT,
                nb_pers DOUBLE PRECISION
            );
            INSERT INTO v2024.r99_fb1_sa_rp_zo VALUES ('REG99_ZO1', 300);

            CREATE TABLE v2024.r99_fb1_mv_qualite_rp (
                code_epci TEXT,
                "sani_loc_nonHLM" DOUBLE PRECISION,
                "sani_ppT" DOUBLE PRECISION
            );
            INSERT INTO v2024.r99_fb1_mv_qualite_rp VALUES ('200000001', 10, NULL);

            CREATE TABLE v2024.r99_fb2_flux_filo (
                code_epci TEXT,
                "Parctot_17" DOUBLE PRECISION,
                "txRest_parctot_1117" TEXT,
                "txDisp_parctot_1117" DOUBLE PRECISION,
                "txRP_parctot17" DOUBLE PRECISION,
                "txLV_parctot17" DOUBLE PRECISION,
                "txRS_parctot17" DOUBLE PRECISION
            );
            INSERT INTO v2024.r99_fb2_flux_filo VALUES
                ('200000001', 10000, '0.012', 0.03, 0.85, 0.09, 0.06);

            CREATE TABLE v2024.r99_fb2_omphale (
                code_epci TEXT,
                annee INTEGER,
                "Central_C" DOUBLE PRECISION
            );
            INSERT INTO v2024.r99_fb2_omphale VALUES
                ('200000001', 2021, 5000),
                ('200000001', 2027, 5200);
            "#,
        )
        .await?;

    Ok(())
}

async fn backend() -> Result<PgBackend> {
    let pool = create_pool(&test_config()).await?;
    setup_test_pack(&pool).await?;
    Ok(PgBackend::new(pool))
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_get_scalar() -> Result<()> {
    let backend = backend().await?;
    let t = table(Source::SaRp);

    assert_eq!(backend.get_scalar(&t, "nb_pers", EPCI).await?, Some(120.0));
    assert_eq!(backend.get_scalar(&t, "nb_pers", EPCI_NULL).await?, None);
    assert_eq!(backend.get_scalar(&t, "nb_pers", "999999999").await?, None);

    let zo = t.at(Granularity::Zone);
    assert_eq!(backend.get_scalar(&zo, "nb_pers", "REG99_ZO1").await?, Some(300.0));

    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_text_column_is_cast() -> Result<()> {
    let backend = backend().await?;
    let t = table(Source::FluxFilo);

    assert_eq!(
        backend.get_scalar(&t, "txRest_parctot_1117", EPCI).await?,
        Some(0.012)
    );
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_unknown_table_and_column() -> Result<()> {
    let backend = backend().await?.with_retry(RetryPolicy::none());

    let err = backend
        .get_scalar(&table(Source::SaRp), "inexistante", EPCI)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::UnknownColumn { .. }), "{:?}", err);

    let err = backend
        .get_scalar(&table(Source::HotelRp), "Nb_menages", EPCI)
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::UnknownTable(_)), "{:?}", err);

    let err = backend
        .get_column_names(&table(Source::HotelRp))
        .await
        .unwrap_err();
    assert!(matches!(err, BackendError::UnknownTable(_)), "{:?}", err);

    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_column_names_and_sum() -> Result<()> {
    let backend = backend().await?;
    let t = table(Source::MvQualiteRp);

    let colonnes = backend.get_column_names(&t).await?;
    assert_eq!(colonnes, vec!["code_epci", "sani_loc_nonHLM", "sani_ppT"]);

    let somme = backend
        .get_sum_of_columns(&t, &colonnes[1..], EPCI)
        .await?;
    assert_eq!(somme, Some(10.0));

    assert_eq!(backend.get_sum_of_columns(&t, &[], EPCI).await?, Some(0.0));
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_projection_and_members() -> Result<()> {
    let backend = backend().await?;
    let t = table(Source::Omphale);

    assert_eq!(
        backend.get_projection_scalar(&t, "Central_C", EPCI, 2027).await?,
        Some(5200.0)
    );
    assert_eq!(
        backend.get_projection_scalar(&t, "Central_C", EPCI, 2030).await?,
        None
    );

    let membres = backend.list_member_codes(&table(Source::SaRp)).await?;
    assert_eq!(membres.len(), 2);
    assert!(membres.contains(EPCI));
    assert!(membres.contains(EPCI_NULL));
    Ok(())
}

#[tokio::test]
#[ignore = "Requires PostgreSQL database"]
async fn test_computation_on_partial_pack() -> Result<()> {
    let backend: Arc<dyn DataBackend> = Arc::new(backend().await?);
    let epci = Epci::new(EPCI, REGION, SchemaVersion::V2024, Arc::new(Parametres::default()));
    let resultat = EpciResultat::new(&epci, backend, 6);

    // Tables absentes du pack : valeurs nulles
    assert_eq!(resultat.b11(false).await, 120);
    assert_eq!(resultat.b11(true).await, 36);
    assert_eq!(resultat.parc_total_actuel().await, 10000.0);
    assert_eq!(resultat.b21().await, 200);
    assert_eq!(resultat.taux_restructuration_an().await, 0.0019900727);
    assert_eq!(
        resultat.besoin_total(true).await,
        resultat.besoin_en_stock(true).await + resultat.demande_potentielle().await
    );
    Ok(())
}

#[tokio::test]
async fn test_unreachable_server_is_unavailable() -> Result<()> {
    let config = DatabaseConfig {
        host: "127.0.0.1".into(),
        port: 1,
        ..DatabaseConfig::default()
    };
    let pool = create_pool(&config).await?;
    let backend = PgBackend::new(pool).with_retry(RetryPolicy {
        max_attempts: 2,
        base_backoff_ms: 10,
    });

    let err = backend
        .get_scalar(&table(Source::SaRp), "nb_pers", EPCI)
        .await
        .unwrap_err();
    assert!(err.is_transient(), "{:?}", err);
    Ok(())
}
