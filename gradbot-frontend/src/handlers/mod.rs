pub mod api;
pub mod app;
pub mod chat;
pub mod documents;
pub mod metrics;
