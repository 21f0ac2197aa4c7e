//! # otelo
//!
//! Moteur de calcul du besoin en logement (méthode OTELO) à l'EPCI et au
//! bassin d'habitat, à partir des packs de données régionaux.
//!
//! ## Features
//!
//! - Besoin en stock (b11 à b17) avec corrections des doubles comptes
//! - Demande potentielle (évolution démographique Omphale et du parc)
//! - Surcharges par EPCI (évolution démographique, taux)
//! - Backend de données abstrait (`DataBackend`), avec une implémentation
//!   en mémoire pour les tests et les fixtures JSON
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use otelo::{Epci, EpciResultat, Parametres, SchemaVersion};
//!
//! let epci = Epci::new("200090751", "32", SchemaVersion::V2024, Arc::new(Parametres::standard()));
//! let resultat = EpciResultat::new(&epci, backend, 6);
//! println!("Besoin total : {}", resultat.besoin_total(true).await);
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod hebergement;
pub mod indicateurs;
pub mod memory;
pub mod params;
pub mod resultat;
pub mod source;
pub mod store;
pub mod taux;
pub mod territoire;

pub use backend::{BackendError, DataBackend, Granularity, SchemaVersion, TableId};
pub use engine::{Resultat, Synthese, SyntheseCustom, PERIODE_PROJECTION_DEFAUT};
pub use error::OteloError;
pub use hebergement::Hebergement;
pub use memory::MemoryBackend;
pub use params::{Calibration, CustomParam, Parametres};
pub use resultat::{EpciResultat, ZoResultat};
pub use source::{RateKind, Source};
pub use store::IndicatorStore;
pub use territoire::{Epci, ZoneOtelo};
