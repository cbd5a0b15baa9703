// Pure normalization of raw seller API records

pub mod catalog;
pub mod feedback;
pub mod fields;
pub mod photo;

pub use catalog::normalize_products;
pub use feedback::rank_feedback;
