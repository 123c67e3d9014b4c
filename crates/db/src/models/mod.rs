//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - An all-`Option` update DTO for partial persists
//! - Status literals typed as enums (no magic strings at call sites)

pub mod run;
pub mod status;
