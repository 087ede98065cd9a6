pub mod auth;
pub mod permissions;
pub mod roles;
pub mod schools;
pub mod settings;
