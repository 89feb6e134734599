//! Built-in file formats.

mod json;
mod lrc;

pub use json::{JsonFormat, JsonInputOptions, JsonOutputOptions};
pub use lrc::{LrcFormat, LrcOptions, SplitMode};
