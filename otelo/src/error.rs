//! Types d'erreurs pour le crate otelo

use thiserror::Error;

/// Erreurs d'appel du moteur de calcul
///
/// Les données absentes ne sont jamais remontées sous forme d'erreur : elles
/// valent 0.0 à la frontière de l'[`IndicatorStore`](crate::store::IndicatorStore).
/// Seules les erreurs de programmation ou de configuration arrivent ici.
#[derive(Debug, Error)]
pub enum OteloError {
    /// Type de taux inconnu pour la feuille des flux
    #[error("Invalid rate kind: {0}. Use: restruc, disp, rp, lv, rs")]
    InvalidRateKind(String),

    /// Catégorie d'hébergement inconnue
    #[error("Unknown hebergement category: {0}")]
    UnknownHebergement(String),

    /// Version de schéma non supportée
    #[error("Unsupported schema version: {0}. Use: 1 (public), 2 (v2024)")]
    UnsupportedVersion(u8),

    /// Fixture JSON illisible
    #[error("Invalid fixture: {0}")]
    Fixture(#[from] serde_json::Error),

    /// Erreur d'I/O lors de la lecture d'une fixture
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
