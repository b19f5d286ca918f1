#![warn(clippy::all, rust_2018_idioms)]

pub mod app;
pub mod blueprint;
pub mod catalog;
pub mod component;
pub mod config;
pub mod connection_manager;
pub mod gesture;
pub mod grid;
pub mod labels;
pub mod routing;
pub mod save_load;
pub mod session;
pub mod simulator;
pub mod validate;
pub mod wire;
pub use app::App;
pub use session::Session;
