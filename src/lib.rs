pub mod backend;
pub mod config;
pub mod proxy;
pub mod refresh;
pub mod shutdown;
