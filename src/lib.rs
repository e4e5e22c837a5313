pub mod app;
pub mod cli;
pub mod config;
pub mod desktop;
pub mod errors;
pub mod forcer;
pub mod resolver;
pub mod selector;
pub mod switcher;

# [ cfg (windows) ]
pub mod win_apis;

# [ cfg (test) ]
mod testing;
