pub mod chat;
pub mod documents;
pub mod export;
pub mod extensions;
pub mod health;
pub mod images;
pub mod messages;
pub mod threads;
