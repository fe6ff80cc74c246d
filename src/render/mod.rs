//! Presentation artifacts produced by an evaluation.
//!
//! Submodules:
//! - `map`: self-contained HTML map.
//! - `table`: processed plant table as CSV.

pub mod map;
pub mod table;
