//! # otelo-pg
//!
//! Calcul du besoin en logement OTELO sur les packs de données régionaux
//! stockés dans PostgreSQL.
//!
//! ## Features
//!
//! - Backend PostgreSQL (`PgBackend`) avec pool de connexions et relecture
//! - Paramétrages embarqués (standard, defaut, filocom) ou fichiers JSON
//! - Rapport console et export JSON
//! - CLI simple
//!
//! ## Usage CLI
//!
//! ```bash
//! # Un EPCI, avec sa zone
//! otelo-pg epci 200090751 --region 24 --schema 2 --zone REG24_ZO28_zone_1
//!
//! # Toute une région, surcharges par EPCI
//! otelo-pg region --region 24 --custom ./custom.json --output ./rapport.json
//!
//! # Sans base de données
//! otelo-pg region --region 24 --fixture ./region24.json
//! ```

pub mod backend;
pub mod config;
pub mod report;

pub use backend::{create_pool, DatabaseConfig, PgBackend, RetryPolicy};
pub use report::{Niveau, RapportBesoins, RapportStatus};
