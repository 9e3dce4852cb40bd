pub mod app;
pub mod bringup;
pub mod config;
pub mod driver;
pub mod effects;
pub mod field;
pub mod input;
pub mod layer;
pub mod logging;
pub mod perf;
pub mod pointer;
pub mod render;
pub mod surface;
pub mod term;
