pub mod curve;
pub mod model_io;
pub mod trace_io;

pub use curve::*;
pub use model_io::*;
pub use trace_io::*;
