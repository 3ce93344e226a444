//! Validation utilities

pub mod endpoint;
pub mod numeric;
pub mod upload;

pub use endpoint::EndpointValidator;
pub use numeric::NumericValidator;
pub use upload::UploadValidator;
