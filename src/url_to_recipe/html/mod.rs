pub mod extractors;
pub mod locator;

pub use locator::{locate, parse_block};
