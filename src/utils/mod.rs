//! Shared utilities

pub mod validation;

pub use validation::{EndpointValidator, NumericValidator, UploadValidator};
