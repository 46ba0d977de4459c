pub mod catalog;
pub mod error;
pub mod history;
pub mod models;
pub mod recommend;
pub mod service;
pub mod store;
