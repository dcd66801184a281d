pub mod chat;
pub mod chat_open;
pub mod creative;
pub mod discover;
pub mod screen_profile;
