pub mod auth;
pub mod role;
pub mod school;
pub mod server;
