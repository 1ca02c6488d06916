pub mod config;
pub mod error;

pub mod db;
pub mod push;
pub mod server;
