//! Built-in project transforms.

mod tempo;
mod transpose;

pub use tempo::{NormalizeTempo, NormalizeTempoOptions};
pub use transpose::{TransposeKey, TransposeOptions};
