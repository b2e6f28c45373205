pub mod api;
pub mod blockchain;
pub mod config;
pub mod events;
pub mod fetcher;
pub mod mirror;
pub mod models;
pub mod retry;
pub mod shipment;
pub mod storage;
pub mod submitter;
pub mod timeline;
