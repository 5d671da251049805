pub mod demo;
pub mod traits;
