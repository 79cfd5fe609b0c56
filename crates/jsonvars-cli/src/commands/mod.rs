//! Command implementations for jsonvars-cli

pub mod get;
pub mod list;
pub mod render;

pub use get::run_get;
pub use list::run_list;
pub use render::run_render;
