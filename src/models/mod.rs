pub mod app_state;
pub mod chat;
pub mod command;
pub mod error;
pub mod quiz;
pub mod session;
