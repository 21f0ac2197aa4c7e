//! Feuilles des packs de données régionaux
//!
//! Chaque feuille existe en deux tables : une à l'EPCI (`r{region}_{feuille}`)
//! et une agrégée à la zone (`r{region}_{feuille}_zo`).

use std::fmt;
use std::str::FromStr;

use crate::backend::{Granularity, SchemaVersion, TableId};
use crate::OteloError;

/// Feuille (source d'indicateurs) d'un pack régional
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    Synthese,
    SaRp,
    FortuneRp,
    HotelRp,
    SaSne,
    FortuneSne,
    HotelSne,
    HebergesFiness,
    CohabIntergFilo,
    HebergesSne,
    InadeqFin,
    MvQualiteRp,
    MvQualiteFilo,
    MvQualiteFf,
    InadeqPhysiqueRp,
    InadeqPhysiqueFilo,
    ParcSocialSne,
    Omphale,
    FluxFilo,
}

impl Source {
    pub const ALL: [Source; 19] = [
        Source::Synthese,
        Source::SaRp,
        Source::FortuneRp,
        Source::HotelRp,
        Source::SaSne,
        Source::FortuneSne,
        Source::HotelSne,
        Source::HebergesFiness,
        Source::CohabIntergFilo,
        Source::HebergesSne,
        Source::InadeqFin,
        Source::MvQualiteRp,
        Source::MvQualiteFilo,
        Source::MvQualiteFf,
        Source::InadeqPhysiqueRp,
        Source::InadeqPhysiqueFilo,
        Source::ParcSocialSne,
        Source::Omphale,
        Source::FluxFilo,
    ];

    /// Nom de la feuille dans le pack
    pub fn feuille(self) -> &'static str {
        match self {
            Source::Synthese => "f_synthese",
            Source::SaRp => "fb1_sa_rp",
            Source::FortuneRp => "fb1_fortune_rp",
            Source::HotelRp => "fb1_hotel_rp",
            Source::SaSne => "fb1_sa_sne",
            Source::FortuneSne => "fb1_fortune_sne",
            Source::HotelSne => "fb1_hotel_sne",
            Source::HebergesFiness => "fb1_heberges_finess",
            Source::CohabIntergFilo => "fb1_cohab_interg_filo",
            Source::HebergesSne => "fb1_heberges_sne",
            Source::InadeqFin => "fb1_inadeq_fin",
            Source::MvQualiteRp => "fb1_mv_qualite_rp",
            Source::MvQualiteFilo => "fb1_mv_qualite_filo",
            Source::MvQualiteFf => "fb1_mv_qualite_ff",
            Source::InadeqPhysiqueRp => "fb1_inadeq_physique_rp",
            Source::InadeqPhysiqueFilo => "fb1_inadeq_physique_filo",
            Source::ParcSocialSne => "fb1_parc_social_sne",
            Source::Omphale => "fb2_omphale",
            Source::FluxFilo => "fb2_flux_filo",
        }
    }

    /// Table de la feuille pour un pack régional
    pub fn table(self, region: &str, version: SchemaVersion, level: Granularity) -> TableId {
        TableId::new(version, format!("r{}_{}", region, self.feuille()), level)
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feuille())
    }
}

/// Taux structurels portés par la feuille des flux
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateKind {
    /// Restructuration du parc 2011-2017
    Restructuration,
    /// Disparition du parc 2011-2017
    Disparition,
    /// Part des résidences principales
    ResidencesPrincipales,
    /// Part des logements vacants
    LogementsVacants,
    /// Part des résidences secondaires
    ResidencesSecondaires,
}

impl RateKind {
    pub fn code(self) -> &'static str {
        match self {
            RateKind::Restructuration => "restruc",
            RateKind::Disparition => "disp",
            RateKind::ResidencesPrincipales => "rp",
            RateKind::LogementsVacants => "lv",
            RateKind::ResidencesSecondaires => "rs",
        }
    }

    /// Colonne de la feuille des flux
    pub fn column(self) -> &'static str {
        match self {
            RateKind::Restructuration => "txRest_parctot_1117",
            RateKind::Disparition => "txDisp_parctot_1117",
            RateKind::ResidencesPrincipales => "txRP_parctot17",
            RateKind::LogementsVacants => "txLV_parctot17",
            RateKind::ResidencesSecondaires => "txRS_parctot17",
        }
    }
}

impl FromStr for RateKind {
    type Err = OteloError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "restruc" => Ok(RateKind::Restructuration),
            "disp" => Ok(RateKind::Disparition),
            "rp" => Ok(RateKind::ResidencesPrincipales),
            "lv" => Ok(RateKind::LogementsVacants),
            "rs" => Ok(RateKind::ResidencesSecondaires),
            other => Err(OteloError::InvalidRateKind(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nineteen_distinct_feuilles() {
        let mut noms: Vec<_> = Source::ALL.iter().map(|s| s.feuille()).collect();
        noms.sort_unstable();
        noms.dedup();
        assert_eq!(noms.len(), 19);
    }

    #[test]
    fn test_source_table() {
        let table = Source::FluxFilo.table("24", SchemaVersion::V2024, Granularity::Zone);
        assert_eq!(table.qualified_name(), "v2024.r24_fb2_flux_filo_zo");
    }

    #[test]
    fn test_rate_kind_parse() {
        for kind in ["restruc", "disp", "rp", "lv", "rs"] {
            let parsed: RateKind = kind.parse().unwrap();
            assert_eq!(parsed.code(), kind);
        }
        assert!(matches!(
            "vacance".parse::<RateKind>(),
            Err(OteloError::InvalidRateKind(k)) if k == "vacance"
        ));
    }
}
