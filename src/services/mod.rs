pub mod collaborators;
pub mod responder;

pub use collaborators::*;
pub use responder::*;
