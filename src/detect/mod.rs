pub mod fusion;
pub mod text;

pub use fusion::*;
pub use text::*;
