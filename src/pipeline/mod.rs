//! Menu text → dishes → dish photos.
//!
//! The two stages are independent: [`MenuAnalyzer`] turns menu text into a
//! [`DishBatch`](crate::models::DishBatch) and [`ImageBatchGenerator`] turns a
//! batch into one image outcome per dish. Callers compose them.

pub mod analyzer;
pub mod generator;

#[cfg(test)]
pub(crate) mod fakes;

pub use analyzer::{extract_json, parse_dishes, MenuAnalyzer};
pub use generator::ImageBatchGenerator;
