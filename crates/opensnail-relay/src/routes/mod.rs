pub mod auth;
pub mod download;
pub mod health;
pub mod upload;
