pub mod encoder;
pub mod feature_pipeline;
pub mod polynomial;
pub mod scaler;
pub mod split;

pub use encoder::*;
pub use feature_pipeline::*;
pub use polynomial::*;
pub use scaler::*;
pub use split::*;
