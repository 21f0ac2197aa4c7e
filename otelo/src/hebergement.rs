//! Catégories d'hébergement en établissement (FINESS)

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::OteloError;

/// Catégorie d'établissement d'hébergement
///
/// Le nom canonique sert de préfixe aux colonnes de la feuille
/// `fb1_heberges_finess`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Hebergement {
    AireStationNomades,
    AutreCentreAccueil,
    Cada,
    Chrs,
    Cph,
    FoyerJeunesTravailleurs,
    FoyerTravailleursMigrants,
    HebergementFamillesMalades,
    LogementFoyerNonSpecialise,
    MaisonsRelais,
    ResidencesSociales,
}

impl Hebergement {
    pub const ALL: [Hebergement; 11] = [
        Hebergement::AireStationNomades,
        Hebergement::AutreCentreAccueil,
        Hebergement::Cada,
        Hebergement::Chrs,
        Hebergement::Cph,
        Hebergement::FoyerJeunesTravailleurs,
        Hebergement::FoyerTravailleursMigrants,
        Hebergement::HebergementFamillesMalades,
        Hebergement::LogementFoyerNonSpecialise,
        Hebergement::MaisonsRelais,
        Hebergement::ResidencesSociales,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Hebergement::AireStationNomades => "1",
            Hebergement::AutreCentreAccueil => "2",
            Hebergement::Cada => "3",
            Hebergement::Chrs => "4",
            Hebergement::Cph => "5",
            Hebergement::FoyerJeunesTravailleurs => "6",
            Hebergement::FoyerTravailleursMigrants => "7",
            Hebergement::HebergementFamillesMalades => "8",
            Hebergement::LogementFoyerNonSpecialise => "9",
            Hebergement::MaisonsRelais => "A",
            Hebergement::ResidencesSociales => "B",
        }
    }

    /// Nom canonique (préfixe des colonnes FINESS)
    pub fn nom(self) -> &'static str {
        match self {
            Hebergement::AireStationNomades => "Aire Station Nomades",
            Hebergement::AutreCentreAccueil => "Autre Ctre.Accueil",
            Hebergement::Cada => "C.A.D.A.",
            Hebergement::Chrs => "C.H.R.S.",
            Hebergement::Cph => "C.P.H.",
            Hebergement::FoyerJeunesTravailleurs => "Foyer Jeunes Trav.",
            Hebergement::FoyerTravailleursMigrants => "Foyer Trav. Migrants",
            Hebergement::HebergementFamillesMalades => "Héberg.Fam.Malades",
            Hebergement::LogementFoyerNonSpecialise => "Log.Foyer non Spéc.",
            Hebergement::MaisonsRelais => "Maisons Relais-Pens.",
            Hebergement::ResidencesSociales => "Resid.Soc. hors MRel",
        }
    }

    /// Retrouve une catégorie depuis son code
    pub fn from_code(code: &str) -> Result<Self, OteloError> {
        Self::ALL
            .into_iter()
            .find(|h| h.code() == code)
            .ok_or_else(|| OteloError::UnknownHebergement(code.to_string()))
    }
}

impl fmt::Display for Hebergement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.nom())
    }
}

impl FromStr for Hebergement {
    type Err = OteloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s.trim())
    }
}

impl TryFrom<String> for Hebergement {
    type Error = OteloError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Hebergement> for String {
    fn from(value: Hebergement) -> Self {
        value.code().to_string()
    }
}
