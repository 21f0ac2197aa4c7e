//! Tests de bout en bout sur le pack de la région 24 (fixture JSON)

use std::path::Path;
use std::sync::Arc;

use otelo::params::{
    Confort, MotifB17, Occupation, QualiteFf, SourceB11, SourceB14, SourceB15, Surocc,
};
use otelo::{
    CustomParam, DataBackend, Epci, EpciResultat, MemoryBackend, OteloError, Parametres,
    SchemaVersion, ZoResultat, ZoneOtelo,
};

const EPCI: &str = "200090751";
const EPCI_2: &str = "200040715";
const ZONE: &str = "REG24_ZO28_zone_1";

fn backend() -> Arc<dyn DataBackend> {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/region24.json");
    Arc::new(MemoryBackend::load(&path).expect("fixture region24"))
}

fn epci(code: &str, parametre: Parametres) -> Epci {
    Epci::new(code, "24", SchemaVersion::V2024, Arc::new(parametre))
}

fn zone(parametre: Parametres) -> ZoneOtelo {
    ZoneOtelo::new(ZONE, "24", SchemaVersion::V2024, Arc::new(parametre))
}

#[tokio::test]
async fn test_b11_without_establishments() {
    let resultat = EpciResultat::new(&epci(EPCI, Parametres::default()), backend(), 6);

    // (120 + 30 + 10) * 6 / 20
    assert_eq!(resultat.b11(true).await, 48);
    assert_eq!(resultat.b11(false).await, 160);
}

#[tokio::test]
async fn test_reference_values_standard_epci() {
    let resultat = EpciResultat::new(&epci(EPCI, Parametres::standard()), backend(), 6);
    let s = resultat.synthese().await;

    assert_eq!(s.b11, 76);
    assert_eq!(s.b12, 70);
    assert_eq!(s.b13, 30);
    assert_eq!(s.b14, 30);
    assert_eq!(s.b15, 18);
    assert_eq!(s.b17, 27);
    assert_eq!(s.besoin_en_stock, 251);
    assert_eq!(s.besoin_en_rehabilitation, 90);
    assert_eq!(s.parc_rp_actuel, 51000);
    assert_eq!(s.b21, 1212);
    assert_eq!(s.besoin_renouvellement, 1080);
    assert_eq!(s.demande_potentielle, 2506);
    assert_eq!(s.b22, 1294);
    assert_eq!(s.evolution_nb_lv, 128);
    assert_eq!(s.evolution_nb_rs, 86);
    assert_eq!(s.besoin_total, 2757);
    assert_eq!(s.taux_restructuration, 0.0119999999);
    assert_eq!(s.taux_disparition, 0.0299999998);
    assert_eq!(s.taux_lv, 0.09);
    assert_eq!(s.taux_rs, 0.06);
    assert!(s.custom.is_none());
}

#[tokio::test]
async fn test_reference_values_zone() {
    let resultat = ZoResultat::new(&zone(Parametres::standard()), backend(), 6);

    assert_eq!(resultat.besoin_en_stock(true).await, 756);
    assert_eq!(resultat.b21().await, 3636);
    // taux de restructuration lu sous forme de texte dans la table de zone
    assert_eq!(resultat.taux_restructuration().await, 0.0199999998);
    assert_eq!(resultat.taux_lv().await, 0.08);
    assert_eq!(resultat.besoin_renouvellement().await, 1800);
    assert_eq!(resultat.demande_potentielle().await, 3935);
    assert_eq!(resultat.besoin_total(true).await, 4691);
}

#[tokio::test]
async fn test_reference_values_alternative_sources() {
    let parametre = Parametres {
        nom: "FF".to_string(),
        source_b11: SourceB11::Sne,
        b13_taux_effort: 35,
        source_b14: SourceB14::Ff,
        b14_confort: Confort::FfAbsWcSani,
        b14_qualite: Some(QualiteFf::SansEntretien),
        b14_occupation: Occupation::Locataires,
        source_b15: SourceB15::Filo,
        b15_surocc: Surocc::Mod,
        b15_proprietaire: true,
        b17_motif: MotifB17::Assis,
        ..Parametres::default()
    };
    let resultat = EpciResultat::new(&epci(EPCI, parametre), backend(), 6);

    assert_eq!(resultat.b11(true).await, 5);
    assert_eq!(resultat.b13(true).await, 18);
    assert_eq!(resultat.b14(true).await, 2);
    assert_eq!(resultat.b15(true).await, 108);
    assert_eq!(resultat.b17(true).await, 8);
    assert_eq!(resultat.besoin_en_rehabilitation(true).await, 17);
    assert_eq!(resultat.besoin_en_stock(true).await, 211);
    assert_eq!(resultat.besoin_total(true).await, 2717);
}

#[tokio::test]
async fn test_besoin_total_is_stock_plus_flow() {
    let backend = backend();
    for parametre in [Parametres::default(), Parametres::standard()] {
        for code in [EPCI, EPCI_2, "inconnu"] {
            let resultat = EpciResultat::new(&epci(code, parametre.clone()), Arc::clone(&backend), 6);
            let stock = resultat.besoin_en_stock(true).await;
            let flux = resultat.demande_potentielle().await;
            assert_eq!(resultat.besoin_total(true).await, stock + flux, "code {}", code);
        }
        let resultat = ZoResultat::new(&zone(parametre), Arc::clone(&backend), 6);
        assert_eq!(
            resultat.besoin_total(true).await,
            resultat.besoin_en_stock(true).await + resultat.demande_potentielle().await
        );
    }
}

#[tokio::test]
async fn test_resorption_coefficient_boundary() {
    let backend = backend();
    let parametre = Parametres::default();

    let a_horizon = EpciResultat::new(&epci(EPCI, parametre.clone()), Arc::clone(&backend), 20);
    assert_eq!(a_horizon.coeff(true), 1.0);
    assert_eq!(a_horizon.b11(true).await, a_horizon.b11(false).await);
    assert_eq!(a_horizon.besoin_en_stock(true).await, 743);
    assert_eq!(a_horizon.besoin_total(true).await, 9411);

    let au_dela = EpciResultat::new(&epci(EPCI, parametre.clone()), Arc::clone(&backend), 30);
    assert_eq!(au_dela.coeff(true), 1.0);
    assert_eq!(au_dela.b11(true).await, 160);

    for (periode, attendu) in [(3, 24), (5, 40), (10, 80), (15, 120)] {
        let resultat = EpciResultat::new(&epci(EPCI, parametre.clone()), Arc::clone(&backend), periode);
        assert_eq!(resultat.b11(true).await, attendu, "periode {}", periode);
    }
}

#[tokio::test]
async fn test_custom_overlay_precedence() {
    let custom = CustomParam {
        b2_evol_demo_an: Some(150),
        b2_tx_lv_custom: Some(7.0),
        b2_tx_disparition_custom: Some(0.5),
        ..Default::default()
    };
    let resultat = EpciResultat::new(
        &epci(EPCI, Parametres::standard()).with_custom_param(custom),
        backend(),
        6,
    );

    assert_eq!(resultat.taux_lv_custom().await, 0.07);
    assert_eq!(resultat.taux_disparition_custom_an().await, 0.005);
    assert_eq!(resultat.taux_rs_custom().await, resultat.taux_rs().await);
    assert_eq!(
        resultat.taux_restructuration_custom().await,
        resultat.taux_restructuration().await
    );
    assert_eq!(resultat.b21_custom().await, 900);
    assert_eq!(resultat.demande_potentielle_custom().await, 758);
    assert_eq!(resultat.besoin_total_custom(true).await, 1009);
    assert_eq!(resultat.evolution_nb_lv_custom().await, -1224);

    // le calcul standard n'est pas affecté
    assert_eq!(resultat.demande_potentielle().await, 2506);

    let synthese = resultat.synthese().await;
    let custom = synthese.custom.expect("custom section");
    assert_eq!(custom.demande_potentielle, 758);
    assert_eq!(custom.besoin_total, 1009);
}

#[tokio::test]
async fn test_custom_without_overrides_matches_standard() {
    let resultat = EpciResultat::new(&epci(EPCI, Parametres::standard()), backend(), 6);

    assert_eq!(
        resultat.demande_potentielle_custom().await,
        resultat.demande_potentielle().await
    );
    assert_eq!(
        resultat.besoin_total_custom(true).await,
        resultat.besoin_total(true).await
    );
    assert_eq!(resultat.evolution_nb_rs_custom().await, resultat.evolution_nb_rs().await);
    assert_eq!(resultat.b22_custom().await, resultat.b22().await);
}

#[tokio::test]
async fn test_zone_never_applies_custom_overlay() {
    let p = Arc::new(Parametres::standard());
    let zo = Arc::new(ZoneOtelo::new(ZONE, "24", SchemaVersion::V2024, Arc::clone(&p)));
    let epci = Epci::new(EPCI, "24", SchemaVersion::V2024, p)
        .with_custom_param(CustomParam {
            b2_evol_demo_an: Some(1000),
            b2_tx_lv_custom: Some(20.0),
            ..Default::default()
        })
        .with_zone(zo);

    let resultat = EpciResultat::new(&epci, backend(), 6);
    let zone = resultat.zone_resultat().expect("zone");

    assert!(zone.custom_parametre().is_none());
    assert_eq!(
        zone.demande_potentielle_custom().await,
        zone.demande_potentielle().await
    );
    assert_eq!(zone.demande_potentielle().await, 3935);
    assert_ne!(
        resultat.demande_potentielle_custom().await,
        resultat.demande_potentielle().await
    );
}

#[tokio::test]
async fn test_growth_rate_zero_base_year() {
    let parametre = Parametres {
        b2_scenario_omphale: "Haut_H".to_string(),
        ..Parametres::standard()
    };
    let resultat = EpciResultat::new(&epci(EPCI, parametre), backend(), 6);

    assert_eq!(resultat.taux_croissance_annuel().await, 0.0);
    assert_eq!(resultat.b21().await, 300);

    let central = EpciResultat::new(&epci(EPCI, Parametres::standard()), backend(), 6);
    let taux = central.taux_croissance_annuel().await;
    assert!((taux - 0.004).abs() < 1e-8, "taux {}", taux);
}

#[tokio::test]
async fn test_invalid_rate_kind_is_an_error() {
    let resultat = EpciResultat::new(&epci(EPCI, Parametres::standard()), backend(), 6);
    let store = resultat.data();

    assert_eq!(store.rate_by_name("lv", EPCI).await.unwrap(), 0.09);
    assert_eq!(store.rate_by_name("restruc", EPCI).await.unwrap(), 0.012);
    match store.rate_by_name("vacance", EPCI).await {
        Err(OteloError::InvalidRateKind(kind)) => assert_eq!(kind, "vacance"),
        other => panic!("expected InvalidRateKind, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unknown_territory_yields_zero() {
    let resultat = EpciResultat::new(&epci("999999999", Parametres::standard()), backend(), 6);

    assert_eq!(resultat.besoin_en_stock(true).await, 0);
    assert_eq!(resultat.demande_potentielle().await, 0);
    assert_eq!(resultat.besoin_total(true).await, 0);
    assert_eq!(resultat.taux_rp().await, 1.0);
}

#[tokio::test]
async fn test_territory_listing_and_indicators() {
    let resultat = EpciResultat::new(&epci(EPCI, Parametres::standard()), backend(), 6);
    let store = resultat.data();

    assert_eq!(store.epcis().await, vec![EPCI_2, EPCI]);
    assert_eq!(store.zos().await, vec![ZONE]);
    assert!(store.epci_moins_50k(EPCI).await);
    assert!(!store.epci_moins_50k(EPCI_2).await);
    assert_eq!(store.evolution_menages(EPCI).await, 1500);
    assert_eq!(store.evolution_menages(ZONE).await, 4500);
    assert_eq!(store.taux_evolution_annuel_menages(EPCI).await, 0.0051234568);

    let (annees, valeurs) = store.b2_chronique_omphale(EPCI, "Central_C", 2023).await;
    assert_eq!(annees, vec![2017, 2018, 2019, 2020, 2021, 2022]);
    assert_eq!(valeurs[4], 50000.0);
}
