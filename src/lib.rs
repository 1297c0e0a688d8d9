pub mod auth;
pub mod catalog;
pub mod cli;
pub mod common;
pub mod downloader;
pub mod error;
pub mod navigator;
