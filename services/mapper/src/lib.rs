//! KMFK mapping and normalization engine.
//!
//! Turns the eleven KOFIA fund-asset exports into one fixed-schema monthly
//! matrix: every series keyed by a canonical `KMFK.*` code, 60 months deep,
//! with `N.A.` wherever no data exists.

pub mod align;
pub mod assemble;
pub mod classify;
pub mod config;
pub mod dictionary;
pub mod error;
#[cfg(test)]
mod fixtures;
pub mod grid;
pub mod header;
pub mod output;
pub mod period;
pub mod pipeline;
pub mod source;
pub mod synth;
pub mod template;
pub mod validate;

pub use assemble::OutputMatrix;
pub use dictionary::{Category, Field, Metric};
pub use error::{MapError, Result, Shape};
pub use period::{MonthWindow, Period};
pub use pipeline::{Pipeline, RunReport};
pub use template::ColumnTemplate;
