pub mod admin;
pub mod api;
pub mod auction;
pub mod config;
pub mod error;
pub mod payment;
pub mod push;
pub mod scheduler;
pub mod sync;
