pub mod catalog_use_case;
pub mod feedback_use_case;
pub mod ports;

pub use catalog_use_case::CatalogUseCase;
pub use feedback_use_case::FeedbackUseCase;
