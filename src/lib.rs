pub mod audit;
pub mod bootstrap;
pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod github;
pub mod http_server;
pub mod notifier;
pub mod store;
pub mod types;
pub mod verification;
