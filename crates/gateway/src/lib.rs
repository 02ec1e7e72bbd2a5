pub mod api;
pub mod bootstrap;
pub mod cli;
pub mod profile;
pub mod runtime;
pub mod state;
