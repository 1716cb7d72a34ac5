pub mod health;
pub mod quiz_player;
pub mod quiz_question;
