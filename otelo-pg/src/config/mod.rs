//! Paramétrages de calcul et surcharges par EPCI

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use otelo::{CustomParam, Parametres};

/// Noms des paramétrages embarqués
pub const PRESETS: [&str; 3] = ["standard", "defaut", "filocom"];

/// Charge un paramétrage embarqué
pub fn from_preset(preset: &str) -> Result<Parametres> {
    match preset {
        "standard" => load_embedded(include_str!("presets/standard.json")),
        "defaut" => load_embedded(include_str!("presets/defaut.json")),
        "filocom" => load_embedded(include_str!("presets/filocom.json")),
        _ => anyhow::bail!(
            "Unknown preset: {}. Use: {}",
            preset,
            PRESETS.join(", ")
        ),
    }
}

fn load_embedded(json: &str) -> Result<Parametres> {
    serde_json::from_str(json).context("Failed to parse embedded parameters")
}

/// Charge un paramétrage depuis un fichier JSON
///
/// Les champs absents prennent leur valeur par défaut.
pub fn load(path: &Path) -> Result<Parametres> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read parameters file: {}", path.display()))?;

    serde_json::from_str(&content)
        .context(format!("Failed to parse parameters JSON: {}", path.display()))
}

/// Paramétrage embarqué si le nom est connu, fichier JSON sinon
pub fn load_parametres(spec: &str) -> Result<Parametres> {
    if PRESETS.contains(&spec) {
        debug!(preset = spec, "Using embedded parameters");
        return from_preset(spec);
    }
    load(Path::new(spec))
}

/// Charge les surcharges par EPCI (`{"code_epci": {...}, ...}`)
///
/// Les entrées sans aucune surcharge renseignée sont écartées.
pub fn load_custom_params(path: &Path) -> Result<HashMap<String, CustomParam>> {
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read custom parameters file: {}", path.display()))?;

    let customs: HashMap<String, CustomParam> = serde_json::from_str(&content)
        .context(format!("Failed to parse custom parameters JSON: {}", path.display()))?;

    Ok(customs
        .into_iter()
        .filter(|(_, custom)| !custom.is_empty())
        .collect())
}
