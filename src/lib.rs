pub mod agent;
pub mod artifact;
pub mod command;
pub mod config;
pub mod dag;
pub mod errors;
pub mod init;
pub mod logging;
pub mod orchestrator;
pub mod retry;
pub mod spec;
pub mod stage;
