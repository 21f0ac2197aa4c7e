//! Paramétrage du calcul du besoin en logement
//!
//! Un [`Parametres`] est immuable une fois construit et partagé par
//! référence (`Arc`) entre tous les calculs d'un même scénario.
//!
//! Les champs en pourcentage sont exprimés entre 0 et 100 et divisés par 100
//! à l'usage. Aucune borne n'est vérifiée : c'est à l'appelant de fournir
//! des valeurs cohérentes.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::hebergement::Hebergement;

/// Source des données de sans-abris, habitations de fortune et hôtels (b11)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceB11 {
    #[default]
    #[serde(rename = "RP")]
    Rp,
    #[serde(rename = "SNE")]
    Sne,
}

/// Source des données de mauvaise qualité du logement (b14)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceB14 {
    #[default]
    #[serde(rename = "RP")]
    Rp,
    #[serde(rename = "Filo")]
    Filo,
    #[serde(rename = "FF")]
    Ff,
}

/// Source des données d'inadéquation physique (b15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SourceB15 {
    #[default]
    #[serde(rename = "RP")]
    Rp,
    #[serde(rename = "Filo")]
    Filo,
}

/// Élément de confort manquant retenu pour b14
///
/// Les variantes `Rp*` s'appliquent à la source RP, les variantes `Ff*` aux
/// Fichiers Fonciers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Confort {
    #[default]
    #[serde(rename = "RP_abs_sani")]
    RpAbsSani,
    #[serde(rename = "RP_abs_sani_chauf")]
    RpAbsSaniChauf,
    #[serde(rename = "FF_abs_wc")]
    FfAbsWc,
    #[serde(rename = "FF_abs_chauf")]
    FfAbsChauf,
    #[serde(rename = "FF_abs_sani")]
    FfAbsSani,
    #[serde(rename = "FF_abs_wc_chauf")]
    FfAbsWcChauf,
    #[serde(rename = "FF_abs_wc_sani")]
    FfAbsWcSani,
    #[serde(rename = "FF_abs_sani_chauf")]
    FfAbsSaniChauf,
    #[serde(rename = "FF_abs_wc_sani_chauf")]
    FfAbsWcSaniChauf,
}

impl Confort {
    /// Segment de colonne des Fichiers Fonciers
    pub fn segment_ff(self) -> &'static str {
        match self {
            Confort::FfAbsWc => "wc_",
            Confort::FfAbsChauf => "chauff_",
            Confort::FfAbsSani => "sdb_",
            Confort::FfAbsWcChauf => "wc_chauff_",
            Confort::FfAbsWcSani => "wc_sdb_",
            Confort::FfAbsSaniChauf => "sdb_chauff_",
            Confort::FfAbsWcSaniChauf => "3elts_",
            Confort::RpAbsSani | Confort::RpAbsSaniChauf => "",
        }
    }
}

/// Qualité du bâti retenue pour b14 (Fichiers Fonciers)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualiteFf {
    #[serde(rename = "FF_Ind")]
    Indifferente,
    #[serde(rename = "FF_ss_ent")]
    SansEntretien,
    // Le libellé publié contient une espace
    #[serde(rename = "FF_ss_ent_ mvq")]
    SansEntretienMauvaiseQualite,
}

impl QualiteFf {
    pub fn segment_ff(self) -> &'static str {
        match self {
            QualiteFf::Indifferente => "",
            QualiteFf::SansEntretien => "ent_",
            QualiteFf::SansEntretienMauvaiseQualite => "quali_ent_",
        }
    }
}

/// Statut d'occupation retenu pour b14
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Occupation {
    #[serde(rename = "prop")]
    Proprietaires,
    #[serde(rename = "loc")]
    Locataires,
    #[default]
    #[serde(rename = "prop_loc")]
    ProprietairesLocataires,
}

impl Occupation {
    pub fn inclut_locataires(self) -> bool {
        matches!(
            self,
            Occupation::Locataires | Occupation::ProprietairesLocataires
        )
    }

    pub fn inclut_proprietaires(self) -> bool {
        matches!(
            self,
            Occupation::Proprietaires | Occupation::ProprietairesLocataires
        )
    }
}

/// Niveau de suroccupation retenu pour b15
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Surocc {
    /// Suroccupation accentuée
    #[default]
    Acc,
    /// Suroccupation modérée
    Mod,
}

impl Surocc {
    /// Segment de colonne du recensement
    pub fn segment_rp(self) -> &'static str {
        match self {
            Surocc::Acc => "acc",
            Surocc::Mod => "mod",
        }
    }

    /// Segment de colonne Filocom
    pub fn segment_filo(self) -> &'static str {
        match self {
            Surocc::Mod => "leg",
            Surocc::Acc => "lourde",
        }
    }
}

/// Motif de demande de logement social retenu pour b17
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotifB17 {
    #[default]
    Tout,
    Env,
    Assis,
    Rappr,
    Trois,
}

impl MotifB17 {
    /// Colonne de la feuille `fb1_parc_social_sne`
    pub fn column(self) -> &'static str {
        match self {
            MotifB17::Tout => "crea",
            MotifB17::Env => "crea_voisin",
            MotifB17::Assis => "crea_mater",
            MotifB17::Rappr => "crea_services",
            MotifB17::Trois => "crea_motifs",
        }
    }
}

/// Ratio différencié entre la région spécifique et les autres régions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioRegional {
    pub region_specifique: f64,
    pub autres_regions: f64,
}

impl RatioRegional {
    fn pour(&self, specifique: bool) -> f64 {
        if specifique {
            self.region_specifique
        } else {
            self.autres_regions
        }
    }
}

/// Ratio régional dépendant en plus du taux d'effort retenu
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatioParEffort {
    /// Taux d'effort sous le seuil
    pub effort_modere: RatioRegional,
    /// Taux d'effort au-dessus du seuil
    pub effort_eleve: RatioRegional,
}

/// Ratios empiriques de correction des doubles comptes entre catégories
///
/// `ratio_x_y` est la part de la catégorie b1x déjà comptée dans b1y.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Calibration {
    /// Région disposant de ses propres ratios (Île-de-France)
    pub region_specifique: String,
    /// Seuil de taux d'effort séparant les deux jeux de ratios
    pub seuil_taux_effort: u32,
    pub ratio_2_5: RatioRegional,
    pub ratio_3_5: RatioParEffort,
    pub ratio_4_3: RatioParEffort,
    pub ratio_4_5: RatioRegional,
}

impl Default for Calibration {
    fn default() -> Self {
        Self {
            region_specifique: "11".to_string(),
            seuil_taux_effort: 35,
            ratio_2_5: RatioRegional {
                region_specifique: 0.1729,
                autres_regions: 0.0025,
            },
            ratio_3_5: RatioParEffort {
                effort_modere: RatioRegional {
                    region_specifique: 0.077,
                    autres_regions: 0.0101,
                },
                effort_eleve: RatioRegional {
                    region_specifique: 0.0753,
                    autres_regions: 0.0142,
                },
            },
            ratio_4_3: RatioParEffort {
                effort_modere: RatioRegional {
                    region_specifique: 0.0257,
                    autres_regions: 0.0521,
                },
                effort_eleve: RatioRegional {
                    region_specifique: 0.017,
                    autres_regions: 0.0441,
                },
            },
            ratio_4_5: RatioRegional {
                region_specifique: 0.1001,
                autres_regions: 0.0116,
            },
        }
    }
}

impl Calibration {
    fn specifique(&self, code_region: &str) -> bool {
        code_region == self.region_specifique
    }

    fn par_effort(&self, ratio: &RatioParEffort, code_region: &str, taux_effort: u32) -> f64 {
        let jeu = if taux_effort < self.seuil_taux_effort {
            &ratio.effort_modere
        } else {
            &ratio.effort_eleve
        };
        jeu.pour(self.specifique(code_region))
    }

    pub fn ratio_2_5(&self, code_region: &str) -> f64 {
        self.ratio_2_5.pour(self.specifique(code_region))
    }

    pub fn ratio_3_5(&self, code_region: &str, taux_effort: u32) -> f64 {
        self.par_effort(&self.ratio_3_5, code_region, taux_effort)
    }

    pub fn ratio_4_3(&self, code_region: &str, taux_effort: u32) -> f64 {
        self.par_effort(&self.ratio_4_3, code_region, taux_effort)
    }

    pub fn ratio_4_5(&self, code_region: &str) -> f64 {
        self.ratio_4_5.pour(self.specifique(code_region))
    }
}

/// Jeu de paramètres nommé
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parametres {
    pub nom: String,
    /// Nombre d'années pour résorber le besoin en stock
    pub b1_horizon_resorption: u32,

    pub b11_sa: bool,
    pub b11_fortune: bool,
    pub b11_hotel: bool,
    pub source_b11: SourceB11,
    pub b11_etablissement: Vec<Hebergement>,
    /// % des personnes hébergées en établissement à reloger
    pub b11_part_etablissement: u32,

    /// % de cohabitations intergénérationnelles subies
    pub b12_cohab_interg_subie: u32,
    pub b12_heberg_particulier: bool,
    pub b12_heberg_gratuit: bool,
    pub b12_heberg_temporaire: bool,

    /// Taux d'effort (%) au-delà duquel un ménage est en inadéquation financière
    pub b13_taux_effort: u32,
    pub b13_acc: bool,
    pub b13_plp: bool,
    pub b13_taux_reallocation: u32,

    pub source_b14: SourceB14,
    pub b14_confort: Confort,
    pub b14_qualite: Option<QualiteFf>,
    pub b14_occupation: Occupation,
    pub b14_taux_reallocation: u32,

    pub source_b15: SourceB15,
    pub b15_surocc: Surocc,
    pub b15_proprietaire: bool,
    pub b15_loc_hors_hlm: bool,
    pub b15_taux_reallocation: u32,

    pub b17_motif: MotifB17,

    pub b2_scenario_omphale: String,
    /// Ajustements en points de pourcentage des taux annuels
    pub b2_tx_restructuration: f64,
    pub b2_tx_disparition: f64,
    pub b2_tx_vacance: f64,
    pub b2_tx_rs: f64,

    pub calibration: Calibration,
}

impl Default for Parametres {
    fn default() -> Self {
        Self {
            nom: "Défaut".to_string(),
            b1_horizon_resorption: 20,
            b11_sa: true,
            b11_fortune: true,
            b11_hotel: true,
            source_b11: SourceB11::Rp,
            b11_etablissement: Vec::new(),
            b11_part_etablissement: 100,
            b12_cohab_interg_subie: 50,
            b12_heberg_particulier: true,
            b12_heberg_gratuit: true,
            b12_heberg_temporaire: true,
            b13_taux_effort: 30,
            b13_acc: true,
            b13_plp: true,
            b13_taux_reallocation: 80,
            source_b14: SourceB14::Rp,
            b14_confort: Confort::RpAbsSani,
            b14_qualite: None,
            b14_occupation: Occupation::ProprietairesLocataires,
            b14_taux_reallocation: 80,
            source_b15: SourceB15::Rp,
            b15_surocc: Surocc::Acc,
            b15_proprietaire: false,
            b15_loc_hors_hlm: true,
            b15_taux_reallocation: 80,
            b17_motif: MotifB17::Tout,
            b2_scenario_omphale: "Central_C".to_string(),
            b2_tx_restructuration: 0.0,
            b2_tx_disparition: 0.0,
            b2_tx_vacance: 0.0,
            b2_tx_rs: 0.0,
            calibration: Calibration::default(),
        }
    }
}

impl Parametres {
    /// Paramétrage standard : valeurs par défaut et toutes les catégories
    /// d'hébergement en établissement
    pub fn standard() -> Self {
        Self {
            nom: "Standard".to_string(),
            b11_etablissement: Hebergement::ALL.to_vec(),
            ..Default::default()
        }
    }

    /// Noms des catégories d'hébergement retenues, séparés par " - "
    pub fn hebergements_display(&self) -> String {
        self.b11_etablissement
            .iter()
            .map(|h| h.nom())
            .collect::<Vec<_>>()
            .join(" - ")
    }
}

impl fmt::Display for Parametres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.nom)
    }
}

/// Surcharges propres à un EPCI
///
/// Un champ absent laisse le calcul standard s'appliquer. Les taux sont en
/// pourcentage annuel et remplacent le taux annuel standard avant
/// composition sur l'horizon.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CustomParam {
    /// Évolution démographique annuelle (ménages par an)
    pub b2_evol_demo_an: Option<i64>,
    pub b2_tx_restructuration_custom: Option<f64>,
    pub b2_tx_disparition_custom: Option<f64>,
    pub b2_tx_rs_custom: Option<f64>,
    pub b2_tx_lv_custom: Option<f64>,
}

impl CustomParam {
    /// Aucune surcharge renseignée
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let p = Parametres::default();
        assert_eq!(p.b1_horizon_resorption, 20);
        assert_eq!(p.b13_taux_effort, 30);
        assert_eq!(p.b2_scenario_omphale, "Central_C");
        assert!(p.b11_etablissement.is_empty());
        assert!(!p.b15_proprietaire);
    }

    #[test]
    fn test_standard_has_all_hebergements() {
        let p = Parametres::standard();
        assert_eq!(p.b11_etablissement.len(), 11);
        assert_eq!(p.to_string(), "Standard");
        assert!(p
            .hebergements_display()
            .starts_with("Aire Station Nomades - Autre Ctre.Accueil"));
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let p: Parametres = serde_json::from_str(
            r#"{
                "nom": "Test",
                "source_b14": "FF",
                "b14_confort": "FF_abs_wc_sani",
                "b14_qualite": "FF_ss_ent_ mvq",
                "b14_occupation": "loc",
                "b15_surocc": "Mod",
                "b11_etablissement": ["3", "A"]
            }"#,
        )
        .unwrap();

        assert_eq!(p.nom, "Test");
        assert_eq!(p.source_b14, SourceB14::Ff);
        assert_eq!(p.b14_confort, Confort::FfAbsWcSani);
        assert_eq!(p.b14_qualite, Some(QualiteFf::SansEntretienMauvaiseQualite));
        assert_eq!(p.b14_occupation, Occupation::Locataires);
        assert_eq!(p.b15_surocc, Surocc::Mod);
        assert_eq!(
            p.b11_etablissement,
            vec![Hebergement::Cada, Hebergement::MaisonsRelais]
        );
        assert_eq!(p.b13_taux_reallocation, 80);
        assert_eq!(p.calibration, Calibration::default());
    }

    #[test]
    fn test_unknown_source_rejected() {
        assert!(serde_json::from_str::<Parametres>(r#"{"source_b11": "FF"}"#).is_err());
    }

    #[test]
    fn test_unknown_hebergement_rejected_with_code() {
        let err = serde_json::from_str::<Parametres>(r#"{"b11_etablissement": ["4", "Z"]}"#)
            .unwrap_err();
        assert!(
            err.to_string().contains("Unknown hebergement category: Z"),
            "{}",
            err
        );
    }

    #[test]
    fn test_calibration_ratios() {
        let c = Calibration::default();
        assert_eq!(c.ratio_2_5("11"), 0.1729);
        assert_eq!(c.ratio_2_5("24"), 0.0025);
        assert_eq!(c.ratio_4_5("11"), 0.1001);
        assert_eq!(c.ratio_4_5("32"), 0.0116);
        assert_eq!(c.ratio_4_3("24", 30), 0.0521);
        assert_eq!(c.ratio_4_3("24", 35), 0.0441);
        assert_eq!(c.ratio_4_3("11", 30), 0.0257);
        assert_eq!(c.ratio_4_3("11", 40), 0.017);
        assert_eq!(c.ratio_3_5("24", 34), 0.0101);
        assert_eq!(c.ratio_3_5("24", 35), 0.0142);
        assert_eq!(c.ratio_3_5("11", 25), 0.077);
        assert_eq!(c.ratio_3_5("11", 50), 0.0753);
    }

    #[test]
    fn test_occupation_flags() {
        assert!(Occupation::ProprietairesLocataires.inclut_locataires());
        assert!(Occupation::ProprietairesLocataires.inclut_proprietaires());
        assert!(!Occupation::Proprietaires.inclut_locataires());
        assert!(!Occupation::Locataires.inclut_proprietaires());
    }

    #[test]
    fn test_custom_param_empty() {
        assert!(CustomParam::default().is_empty());
        let custom = CustomParam {
            b2_tx_lv_custom: Some(7.5),
            ..Default::default()
        };
        assert!(!custom.is_empty());
    }
}
