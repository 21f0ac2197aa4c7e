//! Interface vers le stockage des packs de données régionaux
//!
//! Le moteur ne connaît la base de données qu'à travers le trait
//! [`DataBackend`] : cinq opérations de lecture paramétrées par un
//! [`TableId`]. L'implémentation PostgreSQL vit dans le crate `otelo-pg`,
//! l'implémentation en mémoire dans [`crate::memory`].

use std::collections::HashSet;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::OteloError;

/// Version du schéma des packs de données
///
/// La version ne change que l'espace de noms des tables et l'année de
/// référence des projections Omphale, jamais la sémantique des indicateurs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum SchemaVersion {
    /// Packs historiques (schéma `public`)
    Legacy,
    /// Packs 2024 (schéma `v2024`)
    V2024,
}

impl SchemaVersion {
    /// Espace de noms PostgreSQL des tables
    pub fn namespace(self) -> &'static str {
        match self {
            SchemaVersion::Legacy => "public",
            SchemaVersion::V2024 => "v2024",
        }
    }

    /// Année de départ des projections démographiques
    pub fn annee_reference(self) -> i32 {
        match self {
            SchemaVersion::Legacy => 2017,
            SchemaVersion::V2024 => 2021,
        }
    }

    /// Numéro de version tel qu'utilisé dans les paramétrages
    pub fn number(self) -> u8 {
        match self {
            SchemaVersion::Legacy => 1,
            SchemaVersion::V2024 => 2,
        }
    }
}

impl TryFrom<u8> for SchemaVersion {
    type Error = OteloError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SchemaVersion::Legacy),
            2 => Ok(SchemaVersion::V2024),
            other => Err(OteloError::UnsupportedVersion(other)),
        }
    }
}

impl From<SchemaVersion> for u8 {
    fn from(version: SchemaVersion) -> Self {
        version.number()
    }
}

impl fmt::Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Granularité d'une table : à l'EPCI ou agrégée à la zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Epci,
    Zone,
}

/// Identifiant d'une table de pack de données
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableId {
    pub schema: SchemaVersion,
    /// Nom de base de la table, sans suffixe de granularité (ex: `r24_fb1_sa_rp`)
    pub base_name: String,
    pub level: Granularity,
}

impl TableId {
    pub fn new(schema: SchemaVersion, base_name: impl Into<String>, level: Granularity) -> Self {
        Self {
            schema,
            base_name: base_name.into(),
            level,
        }
    }

    /// Nom de la table dans son schéma (suffixe `_zo` pour les tables agrégées)
    pub fn table_name(&self) -> String {
        match self.level {
            Granularity::Epci => self.base_name.clone(),
            Granularity::Zone => format!("{}_zo", self.base_name),
        }
    }

    /// Nom qualifié `schema.table`
    pub fn qualified_name(&self) -> String {
        format!("{}.{}", self.schema.namespace(), self.table_name())
    }

    /// Même table à une autre granularité
    pub fn at(&self, level: Granularity) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.qualified_name())
    }
}

/// Erreurs remontées par un backend de données
///
/// Elles ne dépassent jamais l'`IndicatorStore`, qui les convertit en 0.0.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BackendError {
    /// Table absente du stockage
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// Colonne absente de la table
    #[error("Unknown column {column} in {table}")]
    UnknownColumn { table: String, column: String },

    /// Valeur non convertible en nombre
    #[error("Conversion failed for {column}: {reason}")]
    Conversion { column: String, reason: String },

    /// Requête rejetée par le serveur
    #[error("Query failed: {0}")]
    Query(String),

    /// Connexion impossible ou perdue
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

impl BackendError {
    pub fn unknown_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::UnknownColumn {
            table: table.into(),
            column: column.into(),
        }
    }

    pub fn conversion(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Conversion {
            column: column.into(),
            reason: reason.into(),
        }
    }

    /// Une nouvelle tentative a une chance d'aboutir
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Capacité de lecture sur les tables des packs de données
///
/// `Ok(None)` signifie « pas de ligne ou valeur NULL ». Les implémentations
/// ne doivent pas convertir les erreurs en zéro elles-mêmes.
#[async_trait]
pub trait DataBackend: Send + Sync {
    fn backend_tag(&self) -> &'static str {
        "unknown"
    }

    /// Valeur d'une colonne pour un code de territoire
    async fn get_scalar(
        &self,
        table: &TableId,
        column: &str,
        code: &str,
    ) -> Result<Option<f64>, BackendError>;

    /// Noms des colonnes de la table, dans l'ordre du schéma
    async fn get_column_names(&self, table: &TableId) -> Result<Vec<String>, BackendError>;

    /// Somme `COALESCE(colonne, 0)` sur un sous-ensemble de colonnes
    async fn get_sum_of_columns(
        &self,
        table: &TableId,
        columns: &[String],
        code: &str,
    ) -> Result<Option<f64>, BackendError>;

    /// Valeur d'un scénario de projection pour une année
    async fn get_projection_scalar(
        &self,
        table: &TableId,
        scenario: &str,
        code: &str,
        annee: i32,
    ) -> Result<Option<f64>, BackendError>;

    /// Ensemble des codes de territoire présents dans la table
    async fn list_member_codes(&self, table: &TableId) -> Result<HashSet<String>, BackendError>;
}
