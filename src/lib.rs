pub mod application;
pub mod archive;
pub mod commands;
pub mod error;
pub mod http;
pub mod package;
pub mod repository;
pub mod runtime;
pub mod verify;
