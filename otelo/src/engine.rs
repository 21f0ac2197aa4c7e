//! Moteur de calcul du besoin en logement
//!
//! Le besoin total additionne :
//! - le besoin en stock (b11 à b15 et b17), ramené à la période de projection
//!   par le coefficient de résorption ;
//! - la demande potentielle, issue de l'évolution démographique (b21) et de
//!   l'évolution du parc (renouvellement, vacance, résidences secondaires).
//!
//! Toutes les valeurs sont recalculées à chaque appel à partir des
//! paramètres : seul l'[`IndicatorStore`] est conservé, créé au premier
//! accès. Les arrondis reproduisent ceux des chiffres publiés (entier au pair
//! le plus proche, taux à 10 décimales).

use std::sync::{Arc, OnceLock};

use serde::Serialize;
use tracing::debug;

use crate::backend::{DataBackend, SchemaVersion};
use crate::indicateurs::{Allocataire, HebergeSne, Statut};
use crate::params::{CustomParam, Parametres, SourceB11, SourceB14, SourceB15};
use crate::store::IndicatorStore;
use crate::taux::{arrondi, arrondi_10, taux_compose};

/// Période de projection par défaut (années)
pub const PERIODE_PROJECTION_DEFAUT: u32 = 6;

fn part(pourcentage: u32) -> f64 {
    pourcentage as f64 / 100.0
}

/// Part conservée après réallocation interne
fn apres_reallocation(taux_reallocation: u32) -> f64 {
    1.0 - taux_reallocation as f64 / 100.0
}

/// Calcul du besoin en logement pour un territoire et un paramétrage
///
/// Territoire, paramétrage, surcharges et période sont fixés à la
/// construction et ne changent plus.
pub struct Resultat {
    code: String,
    code_region: String,
    version: SchemaVersion,
    parametre: Arc<Parametres>,
    custom_parametre: Option<CustomParam>,
    periode_projection: u32,
    backend: Arc<dyn DataBackend>,
    data: OnceLock<IndicatorStore>,
}

impl Resultat {
    pub fn new(
        code: impl Into<String>,
        code_region: impl Into<String>,
        version: SchemaVersion,
        parametre: Arc<Parametres>,
        custom_parametre: Option<CustomParam>,
        backend: Arc<dyn DataBackend>,
        periode_projection: u32,
    ) -> Self {
        Self {
            code: code.into(),
            code_region: code_region.into(),
            version,
            parametre,
            custom_parametre,
            periode_projection,
            backend,
            data: OnceLock::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn code_region(&self) -> &str {
        &self.code_region
    }

    pub fn version(&self) -> SchemaVersion {
        self.version
    }

    pub fn parametre(&self) -> &Parametres {
        &self.parametre
    }

    /// Surcharges de l'EPCI ; toujours absentes pour une zone
    pub fn custom_parametre(&self) -> Option<&CustomParam> {
        self.custom_parametre.as_ref()
    }

    /// Période de projection (années)
    pub fn periode_projection(&self) -> u32 {
        self.periode_projection
    }

    /// Backend partagé avec les autres résultats
    pub fn backend(&self) -> &Arc<dyn DataBackend> {
        &self.backend
    }

    /// Accès aux indicateurs, créé au premier appel
    pub fn data(&self) -> &IndicatorStore {
        self.data.get_or_init(|| {
            IndicatorStore::new(Arc::clone(&self.backend), self.code_region.clone(), self.version)
        })
    }

    fn custom(&self) -> Option<&CustomParam> {
        self.custom_parametre.as_ref()
    }

    /// Coefficient de résorption du besoin en stock sur la période
    pub fn coeff(&self, projection: bool) -> f64 {
        let horizon = self.parametre.b1_horizon_resorption;
        if projection && self.periode_projection < horizon {
            self.periode_projection as f64 / horizon as f64
        } else {
            1.0
        }
    }

    pub fn ratio_2_5(&self) -> f64 {
        self.parametre.calibration.ratio_2_5(&self.code_region)
    }

    pub fn ratio_3_5(&self) -> f64 {
        self.parametre
            .calibration
            .ratio_3_5(&self.code_region, self.parametre.b13_taux_effort)
    }

    pub fn ratio_4_3(&self) -> f64 {
        self.parametre
            .calibration
            .ratio_4_3(&self.code_region, self.parametre.b13_taux_effort)
    }

    pub fn ratio_4_5(&self) -> f64 {
        self.parametre.calibration.ratio_4_5(&self.code_region)
    }

    // ---- Besoin en stock ----

    /// Sans-abris, habitations de fortune, hôtels et hébergement en établissement
    pub async fn b11(&self, projection: bool) -> i64 {
        let p = &self.parametre;
        let d = self.data();
        let code = self.code.as_str();

        let mut resultat = 0.0;
        match p.source_b11 {
            SourceB11::Rp => {
                if p.b11_sa {
                    resultat += d.b1_sa_rp(code).await;
                }
                if p.b11_fortune {
                    resultat += d.b1_fortune_rp(code).await;
                }
                if p.b11_hotel {
                    resultat += d.b1_hotel_rp(code).await;
                }
            }
            SourceB11::Sne => {
                if p.b11_sa {
                    resultat += d.b1_sa_sne(code).await;
                }
                if p.b11_fortune {
                    resultat += d.b1_fortune_sne(code).await;
                }
                if p.b11_hotel {
                    resultat += d.b1_hotel_sne(code).await;
                }
            }
        }
        for &hebergement in &p.b11_etablissement {
            resultat += part(p.b11_part_etablissement)
                * d.b1_hebergement_finess(code, hebergement).await;
        }
        arrondi(resultat * self.coeff(projection))
    }

    /// Cohabitations subies et ménages hébergés chez un tiers
    pub async fn b12(&self, projection: bool) -> i64 {
        let p = &self.parametre;
        let d = self.data();
        let code = self.code.as_str();

        let mut resultat = part(p.b12_cohab_interg_subie) * d.b1_cohab_interg_filo(code).await;
        if p.b12_heberg_particulier {
            resultat += d.b1_heberges_sne(code, HebergeSne::Particulier).await;
        }
        if p.b12_heberg_gratuit {
            resultat += d.b1_heberges_sne(code, HebergeSne::Gratuit).await;
        }
        if p.b12_heberg_temporaire {
            resultat += d.b1_heberges_sne(code, HebergeSne::Temporaire).await;
        }
        arrondi(resultat * self.coeff(projection))
    }

    /// Inadéquation financière
    pub async fn b13(&self, projection: bool) -> i64 {
        self.b13_detail(projection, true, true).await
    }

    /// b13 avec correction des doubles comptes avec b14 et réallocation au choix
    pub async fn b13_detail(&self, projection: bool, correction: bool, reallocation: bool) -> i64 {
        let p = &self.parametre;
        let d = self.data();
        let code = self.code.as_str();

        let mut resultat = 0.0;
        if p.b13_acc {
            resultat += d
                .b1_inadeq_fin(code, p.b13_taux_effort, Allocataire::Acc)
                .await;
        }
        if p.b13_plp {
            resultat += d
                .b1_inadeq_fin(code, p.b13_taux_effort, Allocataire::Plp)
                .await;
        }
        if correction {
            resultat += -1.0 * self.ratio_4_3() * self.b14(false).await as f64;
        }
        if reallocation {
            resultat *= apres_reallocation(p.b13_taux_reallocation);
        }
        arrondi(resultat * self.coeff(projection))
    }

    /// Mauvaise qualité du logement
    pub async fn b14(&self, projection: bool) -> i64 {
        self.b14_detail(projection, true).await
    }

    pub async fn b14_detail(&self, projection: bool, reallocation: bool) -> i64 {
        let p = &self.parametre;
        let mut resultat = self.mauvaise_qualite(false).await;
        if reallocation {
            resultat *= apres_reallocation(p.b14_taux_reallocation);
        }
        arrondi(resultat * self.coeff(projection))
    }

    async fn mauvaise_qualite(&self, rehabilitation: bool) -> f64 {
        let p = &self.parametre;
        let d = self.data();
        let code = self.code.as_str();
        match p.source_b14 {
            SourceB14::Rp => {
                d.b1_mv_qualite_rp(code, p.b14_confort, rehabilitation, p.b14_occupation)
                    .await
            }
            SourceB14::Filo => {
                d.b1_mv_qualite_filo(code, rehabilitation, p.b14_occupation)
                    .await
            }
            SourceB14::Ff => {
                d.b1_mv_qualite_ff(
                    code,
                    p.b14_confort,
                    p.b14_qualite,
                    rehabilitation,
                    p.b14_occupation,
                )
                .await
            }
        }
    }

    /// Besoin en réhabilitation des propriétaires occupants
    ///
    /// Calcul historique conservé à part : il n'entre pas dans le besoin en
    /// stock et ne subit ni réallocation ni correction.
    pub async fn besoin_en_rehabilitation(&self, projection: bool) -> i64 {
        let resultat = self.mauvaise_qualite(true).await;
        arrondi(resultat * self.coeff(projection))
    }

    /// Inadéquation physique (suroccupation)
    pub async fn b15(&self, projection: bool) -> i64 {
        self.b15_detail(projection, true, true).await
    }

    /// b15 avec correction des doubles comptes avec b12, b13, b14 et
    /// réallocation au choix
    pub async fn b15_detail(&self, projection: bool, correction: bool, reallocation: bool) -> i64 {
        let p = &self.parametre;
        let d = self.data();
        let code = self.code.as_str();

        let mut resultat = 0.0;
        match p.source_b15 {
            SourceB15::Rp => {
                if p.b15_proprietaire {
                    resultat += d
                        .b1_inadeq_physique_rp(code, Statut::Proprietaire, p.b15_surocc)
                        .await;
                }
                if p.b15_loc_hors_hlm {
                    resultat += d
                        .b1_inadeq_physique_rp(code, Statut::LocataireHorsHlm, p.b15_surocc)
                        .await;
                }
            }
            SourceB15::Filo => {
                if p.b15_proprietaire {
                    resultat += d
                        .b1_inadeq_physique_filo(code, Statut::Proprietaire, p.b15_surocc)
                        .await;
                }
                if p.b15_loc_hors_hlm {
                    resultat += d
                        .b1_inadeq_physique_filo(code, Statut::LocataireHorsHlm, p.b15_surocc)
                        .await;
                }
            }
        }
        if correction {
            let doubles_comptes = -1.0 * self.ratio_2_5() * self.b12(false).await as f64
                - self.ratio_3_5() * self.b13(false).await as f64
                - self.ratio_4_5() * self.b14(false).await as f64;
            resultat += doubles_comptes;
        }
        if reallocation {
            resultat *= apres_reallocation(p.b15_taux_reallocation);
        }
        arrondi(resultat * self.coeff(projection))
    }

    /// Demandes de logement social liées à une création de ménage
    pub async fn b17(&self, projection: bool) -> i64 {
        let resultat = self
            .data()
            .b1_parc_social_sne(&self.code, self.parametre.b17_motif)
            .await;
        arrondi(resultat * self.coeff(projection))
    }

    /// Somme de b11 à b15 et b17 (hors réhabilitation)
    pub async fn besoin_en_stock(&self, projection: bool) -> i64 {
        self.b11(projection).await
            + self.b12(projection).await
            + self.b13(projection).await
            + self.b14(projection).await
            + self.b15(projection).await
            + self.b17(projection).await
    }

    // ---- Parc et démographie ----

    pub async fn parc_total_actuel(&self) -> f64 {
        self.data().parc_total(&self.code).await
    }

    /// Parc actuel de résidences principales
    pub async fn parc_rp_actuel(&self) -> i64 {
        let tx_rp_actuel = self.data().b2_taux_rp(&self.code).await;
        arrondi(self.parc_total_actuel().await * tx_rp_actuel)
    }

    pub async fn taux_croissance_annuel(&self) -> f64 {
        self.data()
            .taux_croissance_annuel_omphale(
                &self.code,
                &self.parametre.b2_scenario_omphale,
                self.periode_projection,
            )
            .await
    }

    /// Évolution démographique sur la période (ménages supplémentaires)
    pub async fn b21(&self) -> i64 {
        self.data()
            .b2_omphale(
                &self.code,
                &self.parametre.b2_scenario_omphale,
                self.periode_projection,
            )
            .await
    }

    /// b21 avec l'évolution annuelle saisie pour l'EPCI, si elle est non nulle
    pub async fn b21_custom(&self) -> i64 {
        match self.custom().and_then(|c| c.b2_evol_demo_an) {
            Some(evol_an) if evol_an != 0 => evol_an * self.periode_projection as i64,
            _ => self.b21().await,
        }
    }

    /// Part de la demande potentielle due à l'évolution du parc
    pub async fn b22(&self) -> i64 {
        self.demande_potentielle().await - self.b21().await
    }

    pub async fn b22_custom(&self) -> i64 {
        self.demande_potentielle_custom().await - self.b21_custom().await
    }

    // ---- Demande potentielle ----

    /// Besoin en flux sur la période
    pub async fn demande_potentielle(&self) -> i64 {
        let menages = (self.parc_rp_actuel().await + self.b21().await) as f64;
        let resultat = menages / self.taux_rp().await
            - (self.parc_total_actuel().await - self.besoin_renouvellement().await as f64);
        arrondi(resultat)
    }

    pub async fn demande_potentielle_custom(&self) -> i64 {
        let menages = (self.parc_rp_actuel().await + self.b21_custom().await) as f64;
        let resultat = menages / self.taux_rp_custom().await
            - (self.parc_total_actuel().await
                - self.besoin_renouvellement_custom().await as f64);
        arrondi(resultat)
    }

    /// Logements à reconstruire : positif quand les disparitions
    /// l'emportent sur les restructurations
    pub async fn besoin_renouvellement(&self) -> i64 {
        let renouvellement = self.parc_total_actuel().await
            * (self.taux_restructuration().await - self.taux_disparition().await);
        arrondi(-1.0 * renouvellement)
    }

    pub async fn besoin_renouvellement_custom(&self) -> i64 {
        let renouvellement = self.parc_total_actuel().await
            * (self.taux_restructuration_custom().await
                - self.taux_disparition_custom().await);
        arrondi(-1.0 * renouvellement)
    }

    async fn evolution_stock(
        &self,
        renouvellement: i64,
        demande: i64,
        taux_projete: f64,
        taux_actuel: f64,
    ) -> i64 {
        let parc = self.data().parc_total(&self.code).await;
        arrondi((parc - renouvellement as f64 + demande as f64) * taux_projete - parc * taux_actuel)
    }

    /// Évolution du nombre de logements vacants
    pub async fn evolution_nb_lv(&self) -> i64 {
        let taux_actuel = self.data().b2_taux_lv(&self.code).await;
        self.evolution_stock(
            self.besoin_renouvellement().await,
            self.demande_potentielle().await,
            self.taux_lv().await,
            taux_actuel,
        )
        .await
    }

    pub async fn evolution_nb_lv_custom(&self) -> i64 {
        let taux_actuel = self.data().b2_taux_lv(&self.code).await;
        self.evolution_stock(
            self.besoin_renouvellement_custom().await,
            self.demande_potentielle_custom().await,
            self.taux_lv_custom().await,
            taux_actuel,
        )
        .await
    }

    /// Évolution du nombre de résidences secondaires
    pub async fn evolution_nb_rs(&self) -> i64 {
        let taux_actuel = self.data().b2_taux_rs(&self.code).await;
        self.evolution_stock(
            self.besoin_renouvellement().await,
            self.demande_potentielle().await,
            self.taux_rs().await,
            taux_actuel,
        )
        .await
    }

    pub async fn evolution_nb_rs_custom(&self) -> i64 {
        let taux_actuel = self.data().b2_taux_rs(&self.code).await;
        self.evolution_stock(
            self.besoin_renouvellement_custom().await,
            self.demande_potentielle_custom().await,
            self.taux_rs_custom().await,
            taux_actuel,
        )
        .await
    }

    // ---- Taux ----

    fn sur_periode(&self, taux_an: f64) -> f64 {
        arrondi_10(taux_compose(taux_an, self.periode_projection as f64))
    }

    /// Taux annuel de restructuration, ajusté du paramétrage
    pub async fn taux_restructuration_an(&self) -> f64 {
        let tx_actuel = self.data().b2_taux_restruc_an(&self.code).await;
        arrondi_10(tx_actuel + self.parametre.b2_tx_restructuration / 100.0)
    }

    /// Taux de restructuration sur la période
    pub async fn taux_restructuration(&self) -> f64 {
        self.sur_periode(self.taux_restructuration_an().await)
    }

    pub async fn taux_restructuration_custom_an(&self) -> f64 {
        match self.custom().and_then(|c| c.b2_tx_restructuration_custom) {
            Some(taux) => arrondi_10(taux / 100.0),
            None => self.taux_restructuration_an().await,
        }
    }

    pub async fn taux_restructuration_custom(&self) -> f64 {
        self.sur_periode(self.taux_restructuration_custom_an().await)
    }

    /// Taux annuel de disparition, ajusté du paramétrage
    pub async fn taux_disparition_an(&self) -> f64 {
        let tx_actuel = self.data().b2_taux_disp_an(&self.code).await;
        arrondi_10(tx_actuel + self.parametre.b2_tx_disparition / 100.0)
    }

    pub async fn taux_disparition(&self) -> f64 {
        self.sur_periode(self.taux_disparition_an().await)
    }

    pub async fn taux_disparition_custom_an(&self) -> f64 {
        match self.custom().and_then(|c| c.b2_tx_disparition_custom) {
            Some(taux) => arrondi_10(taux / 100.0),
            None => self.taux_disparition_an().await,
        }
    }

    pub async fn taux_disparition_custom(&self) -> f64 {
        self.sur_periode(self.taux_disparition_custom_an().await)
    }

    /// Part de logements vacants visée
    pub async fn taux_lv(&self) -> f64 {
        let tx_actuel = self.data().b2_taux_lv(&self.code).await;
        arrondi_10(tx_actuel + self.parametre.b2_tx_vacance / 100.0)
    }

    pub async fn taux_lv_custom(&self) -> f64 {
        match self.custom().and_then(|c| c.b2_tx_lv_custom) {
            Some(taux) => arrondi_10(taux / 100.0),
            None => self.taux_lv().await,
        }
    }

    /// Part de résidences secondaires visée
    pub async fn taux_rs(&self) -> f64 {
        let tx_actuel = self.data().b2_taux_rs(&self.code).await;
        arrondi_10(tx_actuel + self.parametre.b2_tx_rs / 100.0)
    }

    pub async fn taux_rs_custom(&self) -> f64 {
        match self.custom().and_then(|c| c.b2_tx_rs_custom) {
            Some(taux) => arrondi_10(taux / 100.0),
            None => self.taux_rs().await,
        }
    }

    /// Part de résidences principales : complément des vacants et secondaires
    pub async fn taux_rp(&self) -> f64 {
        1.0 - self.taux_lv().await - self.taux_rs().await
    }

    pub async fn taux_rp_custom(&self) -> f64 {
        1.0 - self.taux_lv_custom().await - self.taux_rs_custom().await
    }

    // ---- Totaux ----

    /// Besoin total sur la période : stock et flux
    pub async fn besoin_total(&self, projection: bool) -> i64 {
        let stock = self.besoin_en_stock(projection).await;
        let flux = self.demande_potentielle().await;
        debug!(
            code = %self.code,
            besoin_en_stock = stock,
            demande_potentielle = flux,
            "Computed housing need"
        );
        stock + flux
    }

    pub async fn besoin_total_custom(&self, projection: bool) -> i64 {
        self.besoin_en_stock(projection).await + self.demande_potentielle_custom().await
    }

    /// Rassemble tous les indicateurs publiés du territoire
    pub async fn synthese(&self) -> Synthese {
        let custom = match self.custom_parametre {
            Some(_) => Some(SyntheseCustom {
                b21: self.b21_custom().await,
                b22: self.b22_custom().await,
                demande_potentielle: self.demande_potentielle_custom().await,
                besoin_renouvellement: self.besoin_renouvellement_custom().await,
                evolution_nb_lv: self.evolution_nb_lv_custom().await,
                evolution_nb_rs: self.evolution_nb_rs_custom().await,
                taux_restructuration_an: self.taux_restructuration_custom_an().await,
                taux_disparition_an: self.taux_disparition_custom_an().await,
                taux_lv: self.taux_lv_custom().await,
                taux_rs: self.taux_rs_custom().await,
                besoin_total: self.besoin_total_custom(true).await,
            }),
            None => None,
        };

        Synthese {
            code: self.code.clone(),
            code_region: self.code_region.clone(),
            version: self.version,
            parametre: self.parametre.nom.clone(),
            periode_projection: self.periode_projection,
            b11: self.b11(true).await,
            b12: self.b12(true).await,
            b13: self.b13(true).await,
            b14: self.b14(true).await,
            b15: self.b15(true).await,
            b17: self.b17(true).await,
            besoin_en_stock: self.besoin_en_stock(true).await,
            besoin_en_rehabilitation: self.besoin_en_rehabilitation(true).await,
            parc_total_actuel: self.parc_total_actuel().await,
            parc_rp_actuel: self.parc_rp_actuel().await,
            taux_croissance_annuel: self.taux_croissance_annuel().await,
            b21: self.b21().await,
            b22: self.b22().await,
            demande_potentielle: self.demande_potentielle().await,
            besoin_renouvellement: self.besoin_renouvellement().await,
            evolution_nb_lv: self.evolution_nb_lv().await,
            evolution_nb_rs: self.evolution_nb_rs().await,
            taux_restructuration_an: self.taux_restructuration_an().await,
            taux_restructuration: self.taux_restructuration().await,
            taux_disparition_an: self.taux_disparition_an().await,
            taux_disparition: self.taux_disparition().await,
            taux_lv: self.taux_lv().await,
            taux_rs: self.taux_rs().await,
            taux_rp: self.taux_rp().await,
            besoin_total: self.besoin_total(true).await,
            custom,
        }
    }
}

/// Indicateurs publiés d'un territoire
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthese {
    pub code: String,
    pub code_region: String,
    pub version: SchemaVersion,
    pub parametre: String,
    pub periode_projection: u32,
    pub b11: i64,
    pub b12: i64,
    pub b13: i64,
    pub b14: i64,
    pub b15: i64,
    pub b17: i64,
    pub besoin_en_stock: i64,
    pub besoin_en_rehabilitation: i64,
    pub parc_total_actuel: f64,
    pub parc_rp_actuel: i64,
    pub taux_croissance_annuel: f64,
    pub b21: i64,
    pub b22: i64,
    pub demande_potentielle: i64,
    pub besoin_renouvellement: i64,
    pub evolution_nb_lv: i64,
    pub evolution_nb_rs: i64,
    pub taux_restructuration_an: f64,
    pub taux_restructuration: f64,
    pub taux_disparition_an: f64,
    pub taux_disparition: f64,
    pub taux_lv: f64,
    pub taux_rs: f64,
    pub taux_rp: f64,
    pub besoin_total: i64,
    /// Présent seulement quand l'EPCI porte des surcharges
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom: Option<SyntheseCustom>,
}

/// Indicateurs recalculés avec les surcharges de l'EPCI
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyntheseCustom {
    pub b21: i64,
    pub b22: i64,
    pub demande_potentielle: i64,
    pub besoin_renouvellement: i64,
    pub evolution_nb_lv: i64,
    pub evolution_nb_rs: i64,
    pub taux_restructuration_an: f64,
    pub taux_disparition_an: f64,
    pub taux_lv: f64,
    pub taux_rs: f64,
    pub besoin_total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Granularity, TableId};
    use crate::memory::MemoryBackend;
    use crate::source::Source;

    const CODE: &str = "200040715";

    fn table(source: Source) -> TableId {
        source.table("24", SchemaVersion::V2024, Granularity::Epci)
    }

    fn resultat(backend: MemoryBackend, parametre: Parametres, periode: u32) -> Resultat {
        resultat_custom(Arc::new(backend), parametre, None, periode)
    }

    fn resultat_custom(
        backend: Arc<dyn DataBackend>,
        parametre: Parametres,
        custom: Option<CustomParam>,
        periode: u32,
    ) -> Resultat {
        Resultat::new(
            CODE,
            "24",
            SchemaVersion::V2024,
            Arc::new(parametre),
            custom,
            backend,
            periode,
        )
    }

    fn flux(lv: f64, rs: f64, rp: f64) -> MemoryBackend {
        let t = table(Source::FluxFilo);
        MemoryBackend::new()
            .with_value(&t, CODE, "Parctot_17", 10_000.0)
            .with_value(&t, CODE, "txRest_parctot_1117", 0.0)
            .with_value(&t, CODE, "txDisp_parctot_1117", 0.0)
            .with_value(&t, CODE, "txLV_parctot17", lv)
            .with_value(&t, CODE, "txRS_parctot17", rs)
            .with_value(&t, CODE, "txRP_parctot17", rp)
    }

    #[test]
    fn test_bound_at_construction() {
        let custom = CustomParam {
            b2_tx_rs_custom: Some(2.0),
            ..Default::default()
        };
        let r = resultat_custom(
            Arc::new(MemoryBackend::new()),
            Parametres::standard(),
            Some(custom.clone()),
            10,
        );
        assert_eq!(r.code(), CODE);
        assert_eq!(r.code_region(), "24");
        assert_eq!(r.version(), SchemaVersion::V2024);
        assert_eq!(r.parametre().nom, "Standard");
        assert_eq!(r.custom_parametre(), Some(&custom));
        assert_eq!(r.periode_projection(), 10);
        assert_eq!(r.data().version(), SchemaVersion::V2024);
    }

    #[test]
    fn test_coeff() {
        let r = resultat(MemoryBackend::new(), Parametres::default(), 6);
        assert_eq!(r.coeff(true), 0.3);
        assert_eq!(r.coeff(false), 1.0);

        let r = resultat(MemoryBackend::new(), Parametres::default(), 20);
        assert_eq!(r.coeff(true), 1.0);
        let r = resultat(MemoryBackend::new(), Parametres::default(), 25);
        assert_eq!(r.coeff(true), 1.0);
    }

    #[test]
    fn test_ratios_follow_region_and_effort() {
        let r = resultat(MemoryBackend::new(), Parametres::default(), 6);
        assert_eq!(r.ratio_4_3(), 0.0521);
        assert_eq!(r.ratio_3_5(), 0.0101);
        assert_eq!(r.ratio_2_5(), 0.0025);
        assert_eq!(r.ratio_4_5(), 0.0116);
    }

    #[tokio::test]
    async fn test_b13_correction_before_reallocation() {
        let backend = MemoryBackend::new()
            .with_value(&table(Source::InadeqFin), CODE, "nb_all_plus30_Acc", 600.0)
            .with_value(&table(Source::InadeqFin), CODE, "nb_all_plus30_PLP", 400.0)
            .with_value(&table(Source::MvQualiteRp), CODE, "sani_loc_nonHLM", 3000.0)
            .with_value(&table(Source::MvQualiteRp), CODE, "sani_ppT", 2000.0);
        let r = resultat(backend, Parametres::default(), 20);

        // b14 non projeté : 5000 * 0.2
        assert_eq!(r.b14(false).await, 1000);
        assert_eq!(r.b13_detail(false, false, false).await, 1000);
        // 1000 - 0.0521 * 1000 = 947.9
        assert_eq!(r.b13_detail(false, true, false).await, 948);
        // 947.9 * 0.2 = 189.58
        assert_eq!(r.b13(false).await, 190);
    }

    #[tokio::test]
    async fn test_b15_correction_uses_unprojected_siblings() {
        let backend = MemoryBackend::new()
            .with_value(&table(Source::InadeqPhysiqueRp), CODE, "nb_men_acc_loc_nonHLM", 1000.0)
            .with_value(&table(Source::InadeqPhysiqueRp), CODE, "nb_men_acc_ppT", 500.0)
            .with_value(&table(Source::CohabIntergFilo), CODE, "nb_foyers_fiscaux", 2000.0);
        let r = resultat(backend, Parametres::default(), 6);

        assert_eq!(r.b12(false).await, 1000);
        // (1000 - 0.0025 * 1000) * 0.2 = 199.5 puis 199.5 * 0.3 = 59.85
        assert_eq!(r.b15(true).await, 60);
        assert_eq!(r.b15_detail(false, false, false).await, 1000);
    }

    #[tokio::test]
    async fn test_rehabilitation_not_in_stock() {
        let backend = MemoryBackend::new()
            .with_value(&table(Source::MvQualiteFilo), CODE, "pppi_po", 100.0)
            .with_value(&table(Source::MvQualiteFilo), CODE, "pppi_lp", 300.0);
        let parametre = Parametres {
            source_b14: SourceB14::Filo,
            b12_cohab_interg_subie: 0,
            ..Parametres::default()
        };
        let r = resultat(backend, parametre, 20);

        assert_eq!(r.besoin_en_rehabilitation(true).await, 100);
        assert_eq!(r.b14(true).await, 80);
        // b13 devient négatif par la seule correction : -0.0521 * 80 * 0.2
        assert_eq!(r.b13(true).await, -1);
        assert_eq!(
            r.besoin_en_stock(true).await,
            r.b13(true).await + r.b14(true).await + r.b15(true).await
        );
    }

    #[tokio::test]
    async fn test_rates_and_shares() {
        let parametre = Parametres {
            b2_tx_vacance: 1.0,
            ..Parametres::default()
        };
        let r = resultat(flux(0.07, 0.03, 0.9), parametre, 6);

        assert_eq!(r.taux_lv().await, 0.08);
        assert_eq!(r.taux_rs().await, 0.03);
        assert!((r.taux_rp().await - 0.89).abs() < 1e-12);
        assert_eq!(r.taux_restructuration().await, 0.0);
        assert_eq!(r.parc_rp_actuel().await, 9000);
    }

    #[tokio::test]
    async fn test_custom_rates_take_precedence() {
        let custom = CustomParam {
            b2_tx_lv_custom: Some(5.0),
            b2_tx_restructuration_custom: Some(1.0),
            ..Default::default()
        };
        let r = resultat_custom(
            Arc::new(flux(0.07, 0.03, 0.9)),
            Parametres::default(),
            Some(custom),
            6,
        );

        assert_eq!(r.taux_lv_custom().await, 0.05);
        assert_eq!(r.taux_rs_custom().await, r.taux_rs().await);
        assert_eq!(r.taux_restructuration_custom_an().await, 0.01);
        assert_eq!(
            r.taux_restructuration_custom().await,
            arrondi_10(1.01f64.powf(6.0) - 1.0)
        );
        assert_eq!(
            r.taux_disparition_custom().await,
            r.taux_disparition().await
        );
    }

    #[tokio::test]
    async fn test_b21_custom_zero_falls_back() {
        let t = table(Source::Omphale);
        let backend: Arc<dyn DataBackend> = Arc::new(
            MemoryBackend::new()
                .with_projection(&t, CODE, 2021, "Central_C", 1000.0)
                .with_projection(&t, CODE, 2027, "Central_C", 1300.0),
        );
        let evol_demo = |an: i64| {
            Some(CustomParam {
                b2_evol_demo_an: Some(an),
                ..Default::default()
            })
        };

        let r = resultat_custom(Arc::clone(&backend), Parametres::default(), evol_demo(0), 6);
        assert_eq!(r.b21_custom().await, 300);

        let r = resultat_custom(backend, Parametres::default(), evol_demo(-15), 6);
        assert_eq!(r.b21_custom().await, -90);
    }

    #[tokio::test]
    async fn test_zero_principal_share_yields_zero_demand() {
        let r = resultat(flux(0.5, 0.5, 0.0), Parametres::default(), 6);
        assert_eq!(r.taux_rp().await, 0.0);
        assert_eq!(r.demande_potentielle().await, 0);
    }

    #[tokio::test]
    async fn test_synthese_custom_section() {
        let r = resultat(flux(0.07, 0.03, 0.9), Parametres::default(), 6);
        let synthese = r.synthese().await;
        assert!(synthese.custom.is_none());
        assert_eq!(synthese.besoin_total, synthese.besoin_en_stock + synthese.demande_potentielle);

        let json = serde_json::to_value(&synthese).unwrap();
        assert!(json.get("custom").is_none());
        assert_eq!(json["version"], 2);
    }
}
