pub mod app;
pub mod lyrics;
pub mod spectrum;
pub mod spinner;
pub mod status;
