pub mod cli;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod load;
pub mod plot;
pub mod record;
pub mod seed;
