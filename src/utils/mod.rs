pub mod cancel;
pub mod reporting;
