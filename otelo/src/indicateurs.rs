//! Indicateurs nommés des packs régionaux
//!
//! Chaque méthode encode la convention de nommage des colonnes d'une
//! feuille. Toutes renvoient 0.0 quand la donnée manque.

use crate::hebergement::Hebergement;
use crate::params::{Confort, MotifB17, Occupation, QualiteFf, Surocc};
use crate::source::{RateKind, Source};
use crate::store::{ColumnFilter, IndicatorStore};
use crate::taux::{arrondi, arrondi_10, taux_annualise};

/// Durée (années) couverte par les taux de restructuration et de disparition
pub const ANNEES_TAUX_FLUX: f64 = 6.0;

/// Année de lecture de la clé de répartition Omphale
const ANNEE_CLE_OMPHALE: i32 = 2020;

/// Première année des chroniques Omphale
const ANNEE_DEBUT_CHRONIQUE: i32 = 2017;

/// Locataires ou propriétaires pour les inadéquations physiques
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statut {
    Proprietaire,
    LocataireHorsHlm,
}

/// Type d'hébergement chez un tiers (SNE)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HebergeSne {
    Particulier,
    Gratuit,
    Temporaire,
}

impl HebergeSne {
    fn column(self) -> &'static str {
        match self {
            HebergeSne::Particulier => "nb_menages_particulier",
            HebergeSne::Gratuit => "nb_menages_gratuit",
            HebergeSne::Temporaire => "nb_menages_temp",
        }
    }
}

/// Type d'allocataire pour l'inadéquation financière
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocataire {
    /// Accédants
    Acc,
    /// Locataires du parc privé
    Plp,
}

impl Allocataire {
    fn segment(self) -> &'static str {
        match self {
            Allocataire::Acc => "Acc",
            Allocataire::Plp => "PLP",
        }
    }
}

impl IndicatorStore {
    /// Parc total de logements
    pub async fn parc_total(&self, code: &str) -> f64 {
        self.scalar(Source::FluxFilo, "Parctot_17", code).await
    }

    pub async fn b1_sa_rp(&self, code: &str) -> f64 {
        self.scalar(Source::SaRp, "nb_pers", code).await
    }

    pub async fn b1_fortune_rp(&self, code: &str) -> f64 {
        self.scalar(Source::FortuneRp, "fortune_pond", code).await
    }

    pub async fn b1_hotel_rp(&self, code: &str) -> f64 {
        self.scalar(Source::HotelRp, "Nb_menages", code).await
    }

    pub async fn b1_sa_sne(&self, code: &str) -> f64 {
        self.scalar(Source::SaSne, "nb_menages", code).await
    }

    pub async fn b1_fortune_sne(&self, code: &str) -> f64 {
        self.scalar(Source::FortuneSne, "nb_menages_camping", code)
            .await
            + self.scalar(Source::FortuneSne, "nb_menages_squat", code).await
    }

    pub async fn b1_hotel_sne(&self, code: &str) -> f64 {
        self.scalar(Source::HotelSne, "nb_menages", code).await
    }

    /// Personnes hébergées dans une catégorie d'établissement
    pub async fn b1_hebergement_finess(&self, code: &str, hebergement: Hebergement) -> f64 {
        self.sum_columns(
            Source::HebergesFiness,
            code,
            ColumnFilter::StartsWith(hebergement.nom()),
        )
        .await
    }

    pub async fn b1_cohab_interg_filo(&self, code: &str) -> f64 {
        self.scalar(Source::CohabIntergFilo, "nb_foyers_fiscaux", code)
            .await
    }

    pub async fn b1_heberges_sne(&self, code: &str, type_heberge: HebergeSne) -> f64 {
        self.scalar(Source::HebergesSne, type_heberge.column(), code)
            .await
    }

    /// Allocataires dont le taux d'effort dépasse `taux` %
    pub async fn b1_inadeq_fin(&self, code: &str, taux: u32, allocataire: Allocataire) -> f64 {
        let column = format!("nb_all_plus{}_{}", taux, allocataire.segment());
        self.scalar(Source::InadeqFin, &column, code).await
    }

    /// Logements sans confort (recensement)
    ///
    /// La variante `rehabilitation` ne retient que les propriétaires
    /// occupants. Un confort propre aux Fichiers Fonciers ne sélectionne
    /// aucune colonne.
    pub async fn b1_mv_qualite_rp(
        &self,
        code: &str,
        confort: Confort,
        rehabilitation: bool,
        occupation: Occupation,
    ) -> f64 {
        let (locataires, proprietaires) = match confort {
            Confort::RpAbsSani => ("sani_loc_nonHLM", "sani_ppT"),
            Confort::RpAbsSaniChauf => ("sani_chfl_loc_nonHLM", "sani_chfl_ppT"),
            _ => return 0.0,
        };

        let mut colonnes = Vec::with_capacity(2);
        if rehabilitation {
            colonnes.push(proprietaires);
        } else {
            if occupation.inclut_locataires() {
                colonnes.push(locataires);
            }
            if occupation.inclut_proprietaires() {
                colonnes.push(proprietaires);
            }
        }
        self.sum_columns(Source::MvQualiteRp, code, ColumnFilter::Among(&colonnes))
            .await
    }

    /// Parc privé potentiellement indigne (Filocom)
    pub async fn b1_mv_qualite_filo(
        &self,
        code: &str,
        rehabilitation: bool,
        occupation: Occupation,
    ) -> f64 {
        if rehabilitation {
            return self.scalar(Source::MvQualiteFilo, "pppi_po", code).await;
        }
        let mut valeur = 0.0;
        if occupation.inclut_locataires() {
            valeur += self.scalar(Source::MvQualiteFilo, "pppi_lp", code).await;
        }
        if occupation.inclut_proprietaires() {
            valeur += self.scalar(Source::MvQualiteFilo, "pppi_po", code).await;
        }
        valeur
    }

    /// Logements sans confort (Fichiers Fonciers)
    pub async fn b1_mv_qualite_ff(
        &self,
        code: &str,
        confort: Confort,
        qualite: Option<QualiteFf>,
        rehabilitation: bool,
        occupation: Occupation,
    ) -> f64 {
        let variable = format!(
            "pp_ss_{}{}",
            qualite.map(QualiteFf::segment_ff).unwrap_or(""),
            confort.segment_ff()
        );
        let proprietaires = format!("{}ppt", variable);

        if rehabilitation {
            return self.scalar(Source::MvQualiteFf, &proprietaires, code).await;
        }
        let mut valeur = 0.0;
        if occupation.inclut_locataires() {
            let locataires = format!("{}loc", variable);
            valeur += self.scalar(Source::MvQualiteFf, &locataires, code).await;
        }
        if occupation.inclut_proprietaires() {
            valeur += self.scalar(Source::MvQualiteFf, &proprietaires, code).await;
        }
        valeur
    }

    /// Ménages en suroccupation (recensement)
    pub async fn b1_inadeq_physique_rp(&self, code: &str, statut: Statut, surocc: Surocc) -> f64 {
        let proprio = match statut {
            Statut::Proprietaire => "ppT",
            Statut::LocataireHorsHlm => "loc_nonHLM",
        };
        let column = format!("nb_men_{}_{}", surocc.segment_rp(), proprio);
        self.scalar(Source::InadeqPhysiqueRp, &column, code).await
    }

    /// Ménages en suroccupation (Filocom)
    pub async fn b1_inadeq_physique_filo(
        &self,
        code: &str,
        statut: Statut,
        surocc: Surocc,
    ) -> f64 {
        let proprio = match statut {
            Statut::Proprietaire => "po",
            Statut::LocataireHorsHlm => "lp",
        };
        let column = format!("surocc_{}_{}", surocc.segment_filo(), proprio);
        self.scalar(Source::InadeqPhysiqueFilo, &column, code)
            .await
    }

    /// Demandes de logement social motivées par une création de ménage
    pub async fn b1_parc_social_sne(&self, code: &str, motif: MotifB17) -> f64 {
        self.scalar(Source::ParcSocialSne, motif.column(), code)
            .await
    }

    async fn omphale_bornes(&self, code: &str, scenario: &str, periode: u32) -> (f64, f64) {
        let an_n0 = self.version().annee_reference();
        let an_n1 = an_n0 + periode as i32;
        let val_n1 = self
            .projection_value(Source::Omphale, code, scenario, an_n1)
            .await;
        let val_n0 = self
            .projection_value(Source::Omphale, code, scenario, an_n0)
            .await;
        (val_n0, val_n1)
    }

    /// Évolution du nombre de ménages sur la période (projection Omphale)
    pub async fn b2_omphale(&self, code: &str, scenario: &str, periode: u32) -> i64 {
        let (val_n0, val_n1) = self.omphale_bornes(code, scenario, periode).await;
        arrondi(val_n1 - val_n0)
    }

    /// Taux de croissance annuel des ménages (0 si l'année de référence vaut 0)
    pub async fn taux_croissance_annuel_omphale(
        &self,
        code: &str,
        scenario: &str,
        periode: u32,
    ) -> f64 {
        let (val_n0, val_n1) = self.omphale_bornes(code, scenario, periode).await;
        if val_n0 == 0.0 || periode == 0 {
            return 0.0;
        }
        arrondi_10((val_n1 / val_n0).powf(1.0 / periode as f64) - 1.0)
    }

    /// Chronique annuelle d'un scénario, de 2017 à `annee_finale` exclue
    pub async fn b2_chronique_omphale(
        &self,
        code: &str,
        scenario: &str,
        annee_finale: i32,
    ) -> (Vec<i32>, Vec<f64>) {
        let annees: Vec<i32> = (ANNEE_DEBUT_CHRONIQUE..annee_finale).collect();
        let mut valeurs = Vec::with_capacity(annees.len());
        for &annee in &annees {
            valeurs.push(
                self.projection_value(Source::Omphale, code, scenario, annee)
                    .await,
            );
        }
        (annees, valeurs)
    }

    /// Un EPCI de moins de 50 000 habitants porte une clé de répartition
    pub async fn epci_moins_50k(&self, code: &str) -> bool {
        self.projection_value(Source::Omphale, code, "cle", ANNEE_CLE_OMPHALE)
            .await
            != 0.0
    }

    /// Taux annuel de restructuration observé
    pub async fn b2_taux_restruc_an(&self, code: &str) -> f64 {
        taux_annualise(
            self.rate(RateKind::Restructuration, code).await,
            ANNEES_TAUX_FLUX,
        )
    }

    /// Taux annuel de disparition observé
    pub async fn b2_taux_disp_an(&self, code: &str) -> f64 {
        taux_annualise(self.rate(RateKind::Disparition, code).await, ANNEES_TAUX_FLUX)
    }

    pub async fn b2_taux_lv(&self, code: &str) -> f64 {
        self.rate(RateKind::LogementsVacants, code).await
    }

    pub async fn b2_taux_rs(&self, code: &str) -> f64 {
        self.rate(RateKind::ResidencesSecondaires, code).await
    }

    pub async fn b2_taux_rp(&self, code: &str) -> f64 {
        self.rate(RateKind::ResidencesPrincipales, code).await
    }

    /// Évolution du nombre de ménages 2012-2017
    pub async fn evolution_menages(&self, code: &str) -> i64 {
        arrondi(self.scalar(Source::Synthese, "evol_men_1217", code).await)
    }

    pub async fn taux_evolution_annuel_menages(&self, code: &str) -> f64 {
        arrondi_10(self.scalar(Source::Synthese, "tx_evol_men1217", code).await)
    }
}
