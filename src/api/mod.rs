//! Purpose: Define the stable public Rust API boundary for zipnear.
//! Exports: Catalog, record, distance, and error types plus the `resolve` query.
//! Role: Public, additive-only surface used by the CLI and integration tests.
//! Invariants: Callers reach core types through this module rather than `core` paths.

mod resolve;

pub use crate::core::catalog::LocationCatalog;
pub use crate::core::decode::{
    DecodedTable, RawRecord, decode_lines, decode_str, decode_table, decode_table_str,
};
pub use crate::core::distance::{Coordinates, EARTH_RADIUS_MILES, haversine_miles};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::location::{Location, REQUIRED_COLUMNS};
pub use resolve::{Resolution, resolution_json, resolve};
