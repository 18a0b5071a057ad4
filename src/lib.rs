pub mod config;
pub mod functions;
pub mod http;
pub mod lambda;
pub mod logging;
pub mod store;
