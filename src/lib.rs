pub mod api;
pub mod clients;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod source;
pub mod state;
