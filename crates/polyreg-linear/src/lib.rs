pub mod logistic;
pub mod model;
pub mod regression;
pub mod trace;

pub use logistic::*;
pub use model::*;
pub use regression::*;
pub use trace::*;
