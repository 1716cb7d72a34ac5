pub mod health;
pub mod webhook;
pub mod webhook_mw;
