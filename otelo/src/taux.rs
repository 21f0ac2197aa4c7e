//! Arrondis et arithmétique des taux
//!
//! Les chiffres publiés ont été produits avec un arrondi « au pair le plus
//! proche » (2.5 → 2, 3.5 → 4) et des taux tronqués à 10 décimales. Les
//! fonctions de ce module reproduisent ces conventions pour que les
//! résultats restent comparables.

use tracing::warn;

/// Arrondi entier au pair le plus proche
///
/// Une valeur non finie (division par un taux nul) vaut 0.
pub fn arrondi(valeur: f64) -> i64 {
    if !valeur.is_finite() {
        warn!(valeur = %valeur, "Non-finite value rounded to 0");
        return 0;
    }
    valeur.round_ties_even() as i64
}

/// Arrondi à 10 décimales
///
/// L'arrondi porte sur la valeur décimale exacte du flottant : multiplier par
/// 1e10 introduirait une erreur propre au voisinage de la demie.
pub fn arrondi_10(valeur: f64) -> f64 {
    if !valeur.is_finite() {
        warn!(valeur = %valeur, "Non-finite rate rounded to 0");
        return 0.0;
    }
    match format!("{:.10}", valeur).parse::<f64>() {
        Ok(arrondi) => arrondi,
        Err(e) => {
            warn!(valeur = %valeur, error = %e, "Rate rounding failed");
            0.0
        }
    }
}

/// Taux cumulé sur `annees` à partir d'un taux annuel : `(1 + t)^n - 1`
pub fn taux_compose(taux_annuel: f64, annees: f64) -> f64 {
    (1.0 + taux_annuel).powf(annees) - 1.0
}

/// Taux annuel équivalent à un taux cumulé sur `annees` : `(1 + t)^(1/n) - 1`
pub fn taux_annualise(taux_cumule: f64, annees: f64) -> f64 {
    (1.0 + taux_cumule).powf(1.0 / annees) - 1.0
}
