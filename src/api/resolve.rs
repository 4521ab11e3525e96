//! Purpose: Answer the CLI's one question: which city owns a postal code, and what is nearest.
//! Exports: `Resolution`, `resolve`, `resolution_json`.
//! Role: Composes the two catalog queries into a single all-or-nothing result.
//! Invariants: No partial result; either both lookups succeed or the first error is returned.
//! Invariants: JSON field names are additive-only once published.
use serde_json::{Value, json};

use crate::core::catalog::LocationCatalog;
use crate::core::error::Error;
use crate::core::location::Location;

#[derive(Clone, Debug, PartialEq)]
pub struct Resolution<'a> {
    pub postal_code: String,
    pub matched: &'a Location,
    pub closest: &'a Location,
    pub distance_miles: f64,
}

pub fn resolve<'a>(catalog: &'a LocationCatalog, postal_code: &str) -> Result<Resolution<'a>, Error> {
    let matched = catalog.lookup_by_postal_code(postal_code)?;
    let (closest, distance_miles) = catalog.nearest_with_distance(postal_code)?;
    Ok(Resolution {
        postal_code: postal_code.to_string(),
        matched,
        closest,
        distance_miles,
    })
}

pub fn resolution_json(resolution: &Resolution<'_>) -> Value {
    json!({
        "postal_code": resolution.postal_code,
        "match": resolution.matched,
        "closest": resolution.closest,
        "distance_miles": resolution.distance_miles,
    })
}
