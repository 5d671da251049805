pub mod config;
pub mod event;
pub mod http;
pub mod lyrics;
pub mod player;
pub mod spectrum;
pub mod track;
pub mod ui;
pub mod util;
