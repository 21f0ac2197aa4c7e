//! Interrogation des feuilles d'un pack régional
//!
//! L'[`IndicatorStore`] résout un code de territoire vers la table à l'EPCI
//! si le code fait partie de sa population, vers la table agrégée à la zone
//! sinon. Toute donnée absente ou illisible vaut 0.0 : les formules du
//! moteur restent ainsi des fonctions totales sur l'ensemble des codes.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::backend::{BackendError, DataBackend, Granularity, SchemaVersion, TableId};
use crate::source::{RateKind, Source};
use crate::OteloError;

/// Sélection de colonnes à sommer
#[derive(Debug, Clone, Copy)]
pub enum ColumnFilter<'a> {
    /// Colonnes dont le nom figure dans la liste
    Among(&'a [&'a str]),
    /// Colonnes dont le nom commence par le préfixe
    StartsWith(&'a str),
}

impl ColumnFilter<'_> {
    fn accepts(&self, column: &str) -> bool {
        match self {
            ColumnFilter::Among(names) => names.contains(&column),
            ColumnFilter::StartsWith(prefix) => column.starts_with(prefix),
        }
    }
}

/// Accès aux feuilles d'un pack régional
///
/// Les populations d'EPCI et les listes de colonnes sont lues une seule fois
/// par feuille puis conservées. Une instance n'est pas destinée à être
/// partagée entre appelants concurrents : chaque calcul utilise la sienne.
pub struct IndicatorStore {
    backend: Arc<dyn DataBackend>,
    region: String,
    version: SchemaVersion,
    membres: Mutex<HashMap<Source, Arc<HashSet<String>>>>,
    colonnes: Mutex<HashMap<Source, Arc<Vec<String>>>>,
}

impl IndicatorStore {
    pub fn new(
        backend: Arc<dyn DataBackend>,
        region: impl Into<String>,
        version: SchemaVersion,
    ) -> Self {
        Self {
            backend,
            region: region.into(),
            version,
            membres: Mutex::new(HashMap::new()),
            colonnes: Mutex::new(HashMap::new()),
        }
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    /// Table d'une feuille à une granularité donnée
    pub fn table(&self, source: Source, level: Granularity) -> TableId {
        source.table(&self.region, self.version, level)
    }

    fn lock_membres(&self) -> MutexGuard<'_, HashMap<Source, Arc<HashSet<String>>>> {
        self.membres.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn lock_colonnes(&self) -> MutexGuard<'_, HashMap<Source, Arc<Vec<String>>>> {
        self.colonnes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Population des EPCI de la feuille
    async fn membres(&self, source: Source) -> Result<Arc<HashSet<String>>, BackendError> {
        let cached = self.lock_membres().get(&source).cloned();
        if let Some(membres) = cached {
            return Ok(membres);
        }

        let table = self.table(source, Granularity::Epci);
        let membres = Arc::new(self.backend.list_member_codes(&table).await?);
        debug!(table = %table, count = membres.len(), "Loaded EPCI population");
        self.lock_membres().insert(source, Arc::clone(&membres));
        Ok(membres)
    }

    /// Colonnes de la feuille, lues sur la table à l'EPCI
    async fn colonnes(&self, source: Source) -> Result<Arc<Vec<String>>, BackendError> {
        let cached = self.lock_colonnes().get(&source).cloned();
        if let Some(colonnes) = cached {
            return Ok(colonnes);
        }

        let table = self.table(source, Granularity::Epci);
        let colonnes = Arc::new(self.backend.get_column_names(&table).await?);
        self.lock_colonnes().insert(source, Arc::clone(&colonnes));
        Ok(colonnes)
    }

    /// Table à interroger pour ce code : à l'EPCI s'il en fait partie, à la zone sinon
    async fn resolve(&self, source: Source, code: &str) -> Result<TableId, BackendError> {
        let level = if self.membres(source).await?.contains(code) {
            Granularity::Epci
        } else {
            Granularity::Zone
        };
        Ok(self.table(source, level))
    }

    /// Le code appartient-il à la population des EPCI de la feuille ?
    pub async fn is_epci_level(&self, source: Source, code: &str) -> bool {
        match self.membres(source).await {
            Ok(membres) => membres.contains(code),
            Err(e) => {
                warn!(source = %source, error = %e, "EPCI population unavailable");
                false
            }
        }
    }

    /// Codes des EPCI du pack, triés
    pub async fn epcis(&self) -> Vec<String> {
        let mut codes: Vec<String> = match self.membres(Source::SaRp).await {
            Ok(membres) => membres.iter().cloned().collect(),
            Err(e) => {
                warn!(error = %e, "Failed to list EPCI codes");
                Vec::new()
            }
        };
        codes.sort();
        codes
    }

    /// Codes des zones du pack, triés
    pub async fn zos(&self) -> Vec<String> {
        let table = self.table(Source::SaRp, Granularity::Zone);
        let mut codes: Vec<String> = match self.backend.list_member_codes(&table).await {
            Ok(membres) => membres.into_iter().collect(),
            Err(e) => {
                warn!(table = %table, error = %e, "Failed to list zone codes");
                Vec::new()
            }
        };
        codes.sort();
        codes
    }

    /// Valeur d'une colonne pour un territoire (0.0 si absente)
    pub async fn scalar(&self, source: Source, column: &str, code: &str) -> f64 {
        let result = match self.resolve(source, code).await {
            Ok(table) => self.backend.get_scalar(&table, column, code).await,
            Err(e) => Err(e),
        };
        or_zero(result, source, column, code)
    }

    /// Somme des colonnes retenues par le filtre (0.0 si aucune)
    pub async fn sum_columns(&self, source: Source, code: &str, filter: ColumnFilter<'_>) -> f64 {
        let label = match filter {
            ColumnFilter::Among(names) => names.join("+"),
            ColumnFilter::StartsWith(prefix) => format!("{}*", prefix),
        };

        let colonnes = match self.colonnes(source).await {
            Ok(colonnes) => colonnes,
            Err(e) => return or_zero(Err(e), source, &label, code),
        };
        let retenues: Vec<String> = colonnes
            .iter()
            .filter(|c| filter.accepts(c))
            .cloned()
            .collect();
        if retenues.is_empty() {
            debug!(source = %source, filter = %label, "No column matches, defaulting to 0");
            return 0.0;
        }

        let result = match self.resolve(source, code).await {
            Ok(table) => {
                self.backend
                    .get_sum_of_columns(&table, &retenues, code)
                    .await
            }
            Err(e) => Err(e),
        };
        or_zero(result, source, &label, code)
    }

    /// Valeur d'une série de projection pour un scénario et une année
    pub async fn projection_value(
        &self,
        source: Source,
        code: &str,
        scenario: &str,
        annee: i32,
    ) -> f64 {
        let result = match self.resolve(source, code).await {
            Ok(table) => {
                self.backend
                    .get_projection_scalar(&table, scenario, code, annee)
                    .await
            }
            Err(e) => Err(e),
        };
        let label = format!("{}@{}", scenario, annee);
        or_zero(result, source, &label, code)
    }

    /// Taux structurel de la feuille des flux
    pub async fn rate(&self, kind: RateKind, code: &str) -> f64 {
        self.scalar(Source::FluxFilo, kind.column(), code).await
    }

    /// Taux structurel désigné par son nom (`restruc`, `disp`, `rp`, `lv`, `rs`)
    ///
    /// Un nom inconnu est une erreur d'appel, jamais une donnée absente.
    pub async fn rate_by_name(&self, kind: &str, code: &str) -> Result<f64, OteloError> {
        let kind: RateKind = kind.parse()?;
        Ok(self.rate(kind, code).await)
    }
}

fn or_zero(
    result: Result<Option<f64>, BackendError>,
    source: Source,
    column: &str,
    code: &str,
) -> f64 {
    match result {
        Ok(Some(valeur)) => valeur,
        Ok(None) => {
            debug!(source = %source, column, code, "Absent value, defaulting to 0");
            0.0
        }
        Err(e) => {
            warn!(source = %source, column, code, error = %e, "Lookup failed, defaulting to 0");
            0.0
        }
    }
}
