pub mod analysis;
pub mod color;
pub mod controller;
pub mod error;
pub mod model;
pub mod policy;
pub mod session;
pub mod traits;
