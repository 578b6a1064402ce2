pub mod capsule;
pub mod cli;
pub mod config;
pub mod digest;
pub mod domain;
pub mod errors;
pub mod services;
pub mod storage;
