//! Rapport de calcul des besoins en logement
//!
//! Regroupe les synthèses calculées pour un ou plusieurs territoires, avec
//! affichage console et export JSON.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;

use otelo::{SchemaVersion, Synthese};

/// Statut global du calcul
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RapportStatus {
    /// Tous les territoires ont été calculés
    Success,
    /// Calcul terminé avec des avertissements
    WithWarnings,
    /// Aucun territoire calculé
    Empty,
}

/// Niveau géographique d'une ligne du rapport
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Niveau {
    Epci,
    Zone,
}

/// Résultat d'un territoire
#[derive(Debug, Clone, Serialize)]
pub struct LigneTerritoire {
    pub niveau: Niveau,
    #[serde(flatten)]
    pub synthese: Synthese,
}

/// Avertissement rattaché à un territoire
#[derive(Debug, Clone, Serialize)]
pub struct Avertissement {
    pub code: String,
    pub message: String,
}

/// Rapport complet d'un calcul
#[derive(Debug, Clone, Serialize)]
pub struct RapportBesoins {
    pub region: String,
    pub version: SchemaVersion,
    pub parametre: String,
    pub periode_projection: u32,
    /// Backend interrogé (`postgres`, `memory`)
    pub backend: String,
    pub duration_secs: f64,
    pub status: RapportStatus,
    pub territoires: Vec<LigneTerritoire>,
    pub warnings: Vec<Avertissement>,
}

impl RapportBesoins {
    pub fn new(
        region: &str,
        version: SchemaVersion,
        parametre: &str,
        periode_projection: u32,
        backend: &str,
    ) -> Self {
        Self {
            region: region.to_string(),
            version,
            parametre: parametre.to_string(),
            periode_projection,
            backend: backend.to_string(),
            duration_secs: 0.0,
            status: RapportStatus::Empty,
            territoires: Vec::new(),
            warnings: Vec::new(),
        }
    }

    /// Enregistre la synthèse d'un territoire
    pub fn record(&mut self, niveau: Niveau, synthese: Synthese) {
        self.territoires.push(LigneTerritoire { niveau, synthese });
    }

    /// Enregistre un avertissement
    pub fn record_warning(&mut self, code: &str, message: impl Into<String>) {
        self.warnings.push(Avertissement {
            code: code.to_string(),
            message: message.into(),
        });
    }

    /// Définit la durée du calcul
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Trie les lignes (EPCI puis zones, par code) et fixe le statut
    pub fn finalize(&mut self) {
        self.territoires.sort_by(|a, b| {
            (a.niveau, &a.synthese.code).cmp(&(b.niveau, &b.synthese.code))
        });

        self.status = if self.territoires.is_empty() {
            RapportStatus::Empty
        } else if !self.warnings.is_empty() {
            RapportStatus::WithWarnings
        } else {
            RapportStatus::Success
        };
    }

    pub fn epcis(&self) -> impl Iterator<Item = &Synthese> {
        self.par_niveau(Niveau::Epci)
    }

    pub fn zones(&self) -> impl Iterator<Item = &Synthese> {
        self.par_niveau(Niveau::Zone)
    }

    fn par_niveau(&self, niveau: Niveau) -> impl Iterator<Item = &Synthese> {
        self.territoires
            .iter()
            .filter(move |l| l.niveau == niveau)
            .map(|l| &l.synthese)
    }

    /// Besoin total cumulé des EPCI
    pub fn total_besoin_epcis(&self) -> i64 {
        self.epcis().map(|s| s.besoin_total).sum()
    }

    /// Besoin en stock cumulé des EPCI
    pub fn total_stock_epcis(&self) -> i64 {
        self.epcis().map(|s| s.besoin_en_stock).sum()
    }

    /// Demande potentielle cumulée des EPCI
    pub fn total_demande_epcis(&self) -> i64 {
        self.epcis().map(|s| s.demande_potentielle).sum()
    }

    /// Besoin total cumulé des EPCI, surcharges appliquées quand elles existent
    pub fn total_besoin_custom_epcis(&self) -> i64 {
        self.epcis()
            .map(|s| s.custom.as_ref().map_or(s.besoin_total, |c| c.besoin_total))
            .sum()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!(
            "BESOINS EN LOGEMENT - Région {} (schéma v{})",
            self.region, self.version
        );
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Paramétrage: {}", self.parametre);
        println!("Horizon: {} ans", self.periode_projection);
        println!("Backend: {}", self.backend);
        println!("Duration: {:.2}s", self.duration_secs);

        if self.territoires.len() == 1 {
            display_detail(&self.territoires[0].synthese);
        } else {
            for (titre, niveau) in [("EPCI", Niveau::Epci), ("ZONES", Niveau::Zone)] {
                let lignes: Vec<_> = self.par_niveau(niveau).collect();
                if lignes.is_empty() {
                    continue;
                }
                println!("\n--- {} ({}) ---", titre, lignes.len());
                println!(
                    "  {:<24} {:>10} {:>10} {:>10} {:>10}",
                    "code", "stock", "demande", "total", "custom"
                );
                for s in lignes {
                    let custom = s
                        .custom
                        .as_ref()
                        .map(|c| c.besoin_total.to_string())
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "  {:<24} {:>10} {:>10} {:>10} {:>10}",
                        s.code, s.besoin_en_stock, s.demande_potentielle, s.besoin_total, custom
                    );
                }
            }
        }

        if self.epcis().count() > 1 {
            println!("\n--- TOTAL EPCI ---");
            println!(
                "Stock: {}, demande: {}, total: {} (avec surcharges: {})",
                self.total_stock_epcis(),
                self.total_demande_epcis(),
                self.total_besoin_epcis(),
                self.total_besoin_custom_epcis()
            );
        }

        if !self.warnings.is_empty() {
            println!("\n--- WARNINGS ({}) ---", self.warnings.len());
            for w in self.warnings.iter().take(10) {
                println!("  [{}] {}", w.code, w.message);
            }
            if self.warnings.len() > 10 {
                println!("  ... and {} more", self.warnings.len() - 10);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "Région {}: {} EPCI, {} zones, besoin total EPCI {}, {} warnings",
            self.region,
            self.epcis().count(),
            self.zones().count(),
            self.total_besoin_epcis(),
            self.warnings.len()
        )
    }
}

/// Détail des indicateurs d'un territoire
fn display_detail(s: &Synthese) {
    println!("\n--- {} ---", s.code);

    println!("\nBesoin en stock (résorption sur l'horizon):");
    println!("  b11 hors logement:             {:>8}", s.b11);
    println!("  b12 hébergés:                  {:>8}", s.b12);
    println!("  b13 inadéquation financière:   {:>8}", s.b13);
    println!("  b14 mauvaise qualité:          {:>8}", s.b14);
    println!("  b15 inadéquation physique:     {:>8}", s.b15);
    println!("  b17 parc social:               {:>8}", s.b17);
    println!("  Total stock:                   {:>8}", s.besoin_en_stock);
    println!("  Réhabilitation:                {:>8}", s.besoin_en_rehabilitation);

    println!("\nDemande potentielle:");
    println!("  Parc total actuel:             {:>8}", s.parc_total_actuel);
    println!("  Résidences principales:        {:>8}", s.parc_rp_actuel);
    println!("  Croissance annuelle:           {:>8.4}%", s.taux_croissance_annuel * 100.0);
    println!("  b21 démographie:               {:>8}", s.b21);
    println!("  b22 évolution du parc:         {:>8}", s.b22);
    println!("    renouvellement:              {:>8}", s.besoin_renouvellement);
    println!("    logements vacants:           {:>8}", s.evolution_nb_lv);
    println!("    résidences secondaires:      {:>8}", s.evolution_nb_rs);
    println!("  Total demande:                 {:>8}", s.demande_potentielle);

    println!("\nTaux (annuel / horizon):");
    println!(
        "  restructuration: {:.4}% / {:.4}%",
        s.taux_restructuration_an * 100.0,
        s.taux_restructuration * 100.0
    );
    println!(
        "  disparition:     {:.4}% / {:.4}%",
        s.taux_disparition_an * 100.0,
        s.taux_disparition * 100.0
    );
    println!(
        "  LV {:.2}%, RS {:.2}%, RP {:.2}%",
        s.taux_lv * 100.0,
        s.taux_rs * 100.0,
        s.taux_rp * 100.0
    );

    println!("\nBESOIN TOTAL: {}", s.besoin_total);

    if let Some(c) = &s.custom {
        println!("\nAvec surcharges:");
        println!("  b21: {}, b22: {}", c.b21, c.b22);
        println!(
            "  renouvellement: {}, LV: {}, RS: {}",
            c.besoin_renouvellement, c.evolution_nb_lv, c.evolution_nb_rs
        );
        println!("  demande potentielle: {}", c.demande_potentielle);
        println!("  BESOIN TOTAL: {}", c.besoin_total);
    }
}
