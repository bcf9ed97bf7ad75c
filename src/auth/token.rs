//! Token value wrapper and the metadata projected from validated tokens.

pub mod info;
pub mod secret;
