pub mod classification;
pub mod confusion;

pub use classification::*;
pub use confusion::*;
