pub mod gateway;
pub mod hint;
pub mod quiz_engine;
pub mod repository;
pub mod router;
pub mod score_book;
pub mod session_store;
