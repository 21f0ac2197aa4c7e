//! Requêtes SQL sur les tables des packs régionaux
//!
//! Les identifiants (schéma, table, colonnes) sont toujours quotés ; les codes
//! de territoire et les années sont passés en paramètres. Toutes les valeurs
//! sont converties en `double precision` côté serveur.

use std::sync::OnceLock;

use regex::Regex;

use otelo::{Granularity, TableId};

/// Colonne des années des tables de projection
pub const COLONNE_ANNEE: &str = "annee";

/// Colonnes d'une table, dans l'ordre du schéma
pub const SELECT_COLUMNS: &str = "SELECT column_name::text \
     FROM information_schema.columns \
     WHERE table_schema::text = $1 AND table_name::text = $2 \
     ORDER BY ordinal_position";

fn region_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[0-9]{2}$").expect("valid region regex"))
}

/// Code région d'un pack (deux chiffres)
pub fn is_valid_region(code: &str) -> bool {
    region_regex().is_match(code)
}

/// Quote un identifiant SQL
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Colonne clé d'une table selon sa granularité
pub fn key_column(level: Granularity) -> &'static str {
    match level {
        Granularity::Epci => "code_epci",
        Granularity::Zone => "code_zo",
    }
}

/// `"schema"."table"`
pub fn qualified(table: &TableId) -> String {
    format!(
        "{}.{}",
        quote_ident(table.schema.namespace()),
        quote_ident(&table.table_name())
    )
}

/// Valeur d'une colonne pour un territoire
pub fn select_scalar(table: &TableId, column: &str) -> String {
    let key = quote_ident(key_column(table.level));
    format!(
        "SELECT {}::double precision FROM {} WHERE {}::text = $1 LIMIT 1",
        quote_ident(column),
        qualified(table),
        key
    )
}

/// Somme de colonnes pour un territoire, les NULL valant 0
pub fn select_sum(table: &TableId, columns: &[String]) -> String {
    let key = quote_ident(key_column(table.level));
    let somme = columns
        .iter()
        .map(|c| format!("COALESCE({}::double precision, 0)", quote_ident(c)))
        .collect::<Vec<_>>()
        .join(" + ");
    format!(
        "SELECT ({})::double precision FROM {} WHERE {}::text = $1 LIMIT 1",
        somme,
        qualified(table),
        key
    )
}

/// Valeur d'un scénario de projection pour un territoire et une année
pub fn select_projection(table: &TableId, scenario: &str) -> String {
    let key = quote_ident(key_column(table.level));
    format!(
        "SELECT {}::double precision FROM {} WHERE {}::text = $1 AND {}::integer = $2 LIMIT 1",
        quote_ident(scenario),
        qualified(table),
        key,
        quote_ident(COLONNE_ANNEE)
    )
}

/// Codes présents dans une table
pub fn select_members(table: &TableId) -> String {
    let key = quote_ident(key_column(table.level));
    format!(
        "SELECT DISTINCT {}::text FROM {} WHERE {} IS NOT NULL",
        key,
        qualified(table),
        key
    )
}
