//! Test doubles for the OMS store seam plus small fixture helpers.

pub mod faults;
pub mod memory;

pub use faults::FaultyStore;
pub use memory::InMemoryStore;

use oms_domain::{Price, Quantity};

/// Parse a quantity literal. Panics on bad input; fixtures only.
pub fn qty(s: &str) -> Quantity {
    match Quantity::parse(s, "qty") {
        Ok(q) => q,
        Err(e) => panic!("bad quantity fixture {s:?}: {e}"),
    }
}

/// Parse a price literal. Panics on bad input; fixtures only.
pub fn price(s: &str) -> Price {
    match Price::parse(s, "price") {
        Ok(p) => p,
        Err(e) => panic!("bad price fixture {s:?}: {e}"),
    }
}
