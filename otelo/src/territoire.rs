//! Territoires de calcul : EPCI et zones (bassins d'habitat)

use std::sync::Arc;

use crate::backend::SchemaVersion;
use crate::params::{CustomParam, Parametres};

/// Bassin d'habitat (zone OTELO), composé d'un ou plusieurs EPCI
#[derive(Debug, Clone)]
pub struct ZoneOtelo {
    pub code: String,
    pub code_region: String,
    pub version: SchemaVersion,
    pub parametre: Arc<Parametres>,
}

impl ZoneOtelo {
    pub fn new(
        code: impl Into<String>,
        code_region: impl Into<String>,
        version: SchemaVersion,
        parametre: Arc<Parametres>,
    ) -> Self {
        Self {
            code: code.into(),
            code_region: code_region.into(),
            version,
            parametre,
        }
    }
}

/// Établissement public de coopération intercommunale
#[derive(Debug, Clone)]
pub struct Epci {
    pub code: String,
    pub code_region: String,
    pub version: SchemaVersion,
    pub parametre: Arc<Parametres>,
    /// Surcharges propres à l'EPCI
    pub custom_param: Option<CustomParam>,
    /// Zone contenant l'EPCI
    pub zo: Option<Arc<ZoneOtelo>>,
}

impl Epci {
    pub fn new(
        code: impl Into<String>,
        code_region: impl Into<String>,
        version: SchemaVersion,
        parametre: Arc<Parametres>,
    ) -> Self {
        Self {
            code: code.into(),
            code_region: code_region.into(),
            version,
            parametre,
            custom_param: None,
            zo: None,
        }
    }

    /// Attache des surcharges (ignorées si aucune n'est renseignée)
    pub fn with_custom_param(mut self, custom_param: CustomParam) -> Self {
        self.custom_param = (!custom_param.is_empty()).then_some(custom_param);
        self
    }

    /// Rattache l'EPCI à sa zone
    pub fn with_zone(mut self, zo: Arc<ZoneOtelo>) -> Self {
        self.zo = Some(zo);
        self
    }
}
