pub mod commands;
pub mod math;
pub mod model;
