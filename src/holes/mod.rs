//! Hole registry and nearest-hole matching
//!
//! - **HoleRegistry**: immutable snapshot of the project's holes
//! - **RegistryStore**: wholesale-swapped current snapshot with a TTL
//! - **NearestHoleMatcher**: haversine search within a matching radius

mod registry;
mod matcher;

pub use registry::*;
pub use matcher::*;
