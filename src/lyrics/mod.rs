pub mod model;
pub mod sync;
