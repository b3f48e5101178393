//! Named molecule table for the digital ("8-bit alchemy") reaction encoding.
//!
//! Molecules in the continuous stoichiometric encoding are free-form names.
//! The digital encoding instead treats a molecule as an 8-bit value and an
//! enzyme as a bitmask; this table maps the well-known values to readable
//! names so both encodings can share one field.

use std::collections::BTreeMap;

/// Sparse per-tile (or per-cell) chemistry: molecule name → non-negative amount.
pub type ChemMap = BTreeMap<String, f64>;

/// Known molecule names and their 8-bit values. High bit counts correspond to
/// high-energy molecules, low bit counts to simple waste.
pub const MOLECULE_TABLE: &[(&str, u8)] = &[
    ("ATP", 255),
    ("GLUCOSE", 240),
    ("FATTY_ACID", 204),
    ("PROTEIN_A", 170),
    ("PROTEIN_B", 85),
    ("AMMONIA", 51),
    ("TOXIN_A", 128),
    ("CO2", 15),
    ("WATER", 3),
    ("VOID", 0),
];

/// 8-bit value for a named molecule, if it is in the table (case-insensitive).
pub fn bit_value(name: &str) -> Option<u8> {
    MOLECULE_TABLE
        .iter()
        .find(|(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, v)| v)
}

/// Name for an 8-bit molecule value. Unknown values render as `UNK_XX` hex.
pub fn bit_name(value: u8) -> String {
    MOLECULE_TABLE
        .iter()
        .find(|&&(_, v)| v == value)
        .map(|&(n, _)| n.to_string())
        .unwrap_or_else(|| format!("UNK_{value:02X}"))
}

/// All table molecules (excluding VOID) whose value shares at least one bit
/// with `mask`. These are the substrates a digital enzyme can react with.
pub fn names_matching(mask: u8) -> Vec<&'static str> {
    MOLECULE_TABLE
        .iter()
        .filter(|&&(_, v)| v != 0 && v & mask != 0)
        .map(|&(n, _)| n)
        .collect()
}

/// Convenience constructor for a chemistry mapping.
pub fn mixture(pairs: &[(&str, f64)]) -> ChemMap {
    pairs
        .iter()
        .map(|&(name, amount)| (name.to_string(), amount))
        .collect()
}
