pub mod layout;
pub mod renderer;
pub mod surface;
