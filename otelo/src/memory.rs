//! Backend en mémoire
//!
//! Sert de fixture pour les tests et permet un calcul hors ligne à partir
//! d'un fichier JSON :
//!
//! ```json
//! {
//!   "tables": {
//!     "v2024.r24_fb1_sa_rp": {
//!       "columns": ["code_epci", "nb_pers"],
//!       "rows": { "200090751": { "nb_pers": 120 } }
//!     },
//!     "v2024.r24_fb2_omphale": {
//!       "columns": ["Central_C"],
//!       "series": { "200090751": { "2021": { "Central_C": 51000 } } }
//!     }
//!   }
//! }
//! ```
//!
//! Les valeurs suivent les règles de conversion d'un `::double precision`
//! PostgreSQL : nombre ou texte numérique, `null` pour l'absence.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::backend::{BackendError, DataBackend, TableId};
use crate::OteloError;

/// Une table en mémoire
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryTable {
    /// Colonnes dans l'ordre du schéma
    #[serde(default)]
    pub columns: Vec<String>,

    /// Valeurs par code de territoire puis par colonne
    #[serde(default)]
    pub rows: BTreeMap<String, BTreeMap<String, Value>>,

    /// Séries annuelles par code, année puis colonne (projections Omphale)
    #[serde(default)]
    pub series: BTreeMap<String, BTreeMap<i32, BTreeMap<String, Value>>>,
}

impl MemoryTable {
    fn declare_column(&mut self, column: &str) {
        if !self.columns.iter().any(|c| c == column) {
            self.columns.push(column.to_string());
        }
    }

    fn check_column(&self, table: &TableId, column: &str) -> Result<(), BackendError> {
        if self.columns.iter().any(|c| c == column) {
            Ok(())
        } else {
            Err(BackendError::unknown_column(table.qualified_name(), column))
        }
    }
}

/// Backend de données en mémoire, indexé par nom qualifié de table
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MemoryBackend {
    #[serde(default)]
    pub tables: HashMap<String, MemoryTable>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Charge une fixture depuis une chaîne JSON
    pub fn from_json(json: &str) -> Result<Self, OteloError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Charge une fixture depuis un fichier JSON
    pub fn load(path: &Path) -> Result<Self, OteloError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    fn table_mut(&mut self, table: &TableId) -> &mut MemoryTable {
        self.tables.entry(table.qualified_name()).or_default()
    }

    fn table(&self, table: &TableId) -> Result<&MemoryTable, BackendError> {
        self.tables
            .get(&table.qualified_name())
            .ok_or_else(|| BackendError::UnknownTable(table.qualified_name()))
    }

    /// Enregistre une valeur brute (nombre, texte ou null)
    pub fn set_raw(&mut self, table: &TableId, code: &str, column: &str, value: Value) -> &mut Self {
        let t = self.table_mut(table);
        t.declare_column(column);
        t.rows
            .entry(code.to_string())
            .or_default()
            .insert(column.to_string(), value);
        self
    }

    /// Enregistre une valeur numérique
    pub fn set_value(&mut self, table: &TableId, code: &str, column: &str, value: f64) -> &mut Self {
        self.set_raw(table, code, column, Value::from(value))
    }

    /// Enregistre une valeur de série annuelle
    pub fn set_projection(
        &mut self,
        table: &TableId,
        code: &str,
        annee: i32,
        scenario: &str,
        value: f64,
    ) -> &mut Self {
        let t = self.table_mut(table);
        t.declare_column(scenario);
        t.series
            .entry(code.to_string())
            .or_default()
            .entry(annee)
            .or_default()
            .insert(scenario.to_string(), Value::from(value));
        self
    }

    /// Variante chaînable de [`MemoryBackend::set_value`]
    pub fn with_value(mut self, table: &TableId, code: &str, column: &str, value: f64) -> Self {
        self.set_value(table, code, column, value);
        self
    }

    /// Variante chaînable de [`MemoryBackend::set_projection`]
    pub fn with_projection(
        mut self,
        table: &TableId,
        code: &str,
        annee: i32,
        scenario: &str,
        value: f64,
    ) -> Self {
        self.set_projection(table, code, annee, scenario, value);
        self
    }
}

fn to_number(column: &str, value: &Value) -> Result<Option<f64>, BackendError> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(Some)
            .ok_or_else(|| BackendError::conversion(column, format!("{} out of range", n))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|e| BackendError::conversion(column, format!("{:?}: {}", s, e))),
        other => Err(BackendError::conversion(
            column,
            format!("not a number: {}", other),
        )),
    }
}

#[async_trait]
impl DataBackend for MemoryBackend {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn get_scalar(
        &self,
        table: &TableId,
        column: &str,
        code: &str,
    ) -> Result<Option<f64>, BackendError> {
        let t = self.table(table)?;
        t.check_column(table, column)?;
        match t.rows.get(code).and_then(|row| row.get(column)) {
            Some(value) => to_number(column, value),
            None => Ok(None),
        }
    }

    async fn get_column_names(&self, table: &TableId) -> Result<Vec<String>, BackendError> {
        Ok(self.table(table)?.columns.clone())
    }

    async fn get_sum_of_columns(
        &self,
        table: &TableId,
        columns: &[String],
        code: &str,
    ) -> Result<Option<f64>, BackendError> {
        let t = self.table(table)?;
        for column in columns {
            t.check_column(table, column)?;
        }
        let Some(row) = t.rows.get(code) else {
            return Ok(None);
        };
        let mut total = 0.0;
        for column in columns {
            if let Some(value) = row.get(column) {
                total += to_number(column, value)?.unwrap_or(0.0);
            }
        }
        Ok(Some(total))
    }

    async fn get_projection_scalar(
        &self,
        table: &TableId,
        scenario: &str,
        code: &str,
        annee: i32,
    ) -> Result<Option<f64>, BackendError> {
        let t = self.table(table)?;
        t.check_column(table, scenario)?;
        match t
            .series
            .get(code)
            .and_then(|years| years.get(&annee))
            .and_then(|row| row.get(scenario))
        {
            Some(value) => to_number(scenario, value),
            None => Ok(None),
        }
    }

    async fn list_member_codes(&self, table: &TableId) -> Result<HashSet<String>, BackendError> {
        let t = self.table(table)?;
        Ok(t.rows.keys().chain(t.series.keys()).cloned().collect())
    }
}
