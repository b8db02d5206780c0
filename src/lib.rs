pub mod api;
pub mod config;
pub mod data_models;
pub mod downloader;
pub mod error;
pub mod resolver;
pub mod search;
