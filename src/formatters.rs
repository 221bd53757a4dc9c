//! Report formatters.

pub mod dotted;

pub use dotted::DottedFormatter;
