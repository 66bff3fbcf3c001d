pub mod config;
pub mod priority;
pub mod runner;
