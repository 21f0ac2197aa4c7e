//! Résultats à l'EPCI et au bassin d'habitat

use std::ops::Deref;
use std::sync::Arc;

use crate::backend::DataBackend;
use crate::engine::Resultat;
use crate::territoire::{Epci, ZoneOtelo};

/// Résultat pour un EPCI, avec ses surcharges éventuelles
pub struct EpciResultat {
    inner: Resultat,
    zo: Option<Arc<ZoneOtelo>>,
}

impl EpciResultat {
    pub fn new(epci: &Epci, backend: Arc<dyn DataBackend>, periode_projection: u32) -> Self {
        Self {
            inner: Resultat::new(
                epci.code.clone(),
                epci.code_region.clone(),
                epci.version,
                Arc::clone(&epci.parametre),
                epci.custom_param.clone(),
                backend,
                periode_projection,
            ),
            zo: epci.zo.clone(),
        }
    }

    /// Zone contenant l'EPCI
    pub fn zone(&self) -> Option<&ZoneOtelo> {
        self.zo.as_deref()
    }

    /// Résultat de la zone contenant l'EPCI, sur le même backend et la même période
    pub fn zone_resultat(&self) -> Option<ZoResultat> {
        self.zo.as_deref().map(|zo| {
            ZoResultat::new(
                zo,
                Arc::clone(self.inner.backend()),
                self.inner.periode_projection(),
            )
        })
    }
}

impl Deref for EpciResultat {
    type Target = Resultat;

    fn deref(&self) -> &Resultat {
        &self.inner
    }
}

/// Résultat pour un bassin d'habitat
///
/// Une zone ne porte jamais de surcharges : les variantes `_custom` y
/// donnent les mêmes valeurs que le calcul standard.
pub struct ZoResultat {
    inner: Resultat,
}

impl ZoResultat {
    pub fn new(zo: &ZoneOtelo, backend: Arc<dyn DataBackend>, periode_projection: u32) -> Self {
        Self {
            inner: Resultat::new(
                zo.code.clone(),
                zo.code_region.clone(),
                zo.version,
                Arc::clone(&zo.parametre),
                None,
                backend,
                periode_projection,
            ),
        }
    }
}

impl Deref for ZoResultat {
    type Target = Resultat;

    fn deref(&self) -> &Resultat {
        &self.inner
    }
}
