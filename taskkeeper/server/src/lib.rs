pub mod auth;
pub mod config;
pub mod entities;
pub mod store;
pub mod task;
pub mod user;
pub mod web;
