pub mod dataset;
pub mod mnist;
pub mod text;

pub use dataset::*;
pub use mnist::*;
pub use text::*;
