//! Validation utilities shared by the session, padding and configuration code

pub mod geometry;
pub mod numeric;

pub use geometry::GeometryValidator;
pub use numeric::NumericValidator;
