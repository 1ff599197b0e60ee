pub mod account;
pub mod advisor;
pub mod bidding;
pub mod context;
pub mod database;
pub mod error;
pub mod events;
pub mod handlers;
pub mod listing;
pub mod message_broker;
pub mod moderation;
pub mod query;
pub mod reputation;
pub mod scheduler;
pub mod settlement;
pub mod state;
