// Core modules: decoding, records, distance, catalog, and error modeling.
pub mod catalog;
pub mod decode;
pub mod distance;
pub mod error;
pub mod location;
pub mod source;
