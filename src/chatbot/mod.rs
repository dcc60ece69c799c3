//! Chatbot module - relays Discord messages to Gemini.

pub mod database;
pub mod discord;
pub mod engine;
pub mod gemini;
pub mod message;


pub use database::Database;
pub use engine::Router;
pub use gemini::GeminiClient;
