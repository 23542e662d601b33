//! Request-scoped services.

pub mod analyzer;

pub use analyzer::VideoAnalyzer;
