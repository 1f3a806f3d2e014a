pub mod filter;
pub mod sanitize;

pub use filter::*;
pub use sanitize::*;
