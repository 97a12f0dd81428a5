//! vLab ICAP Library
//!
//! Core modules for provisioning ICAP virtual appliances.

pub mod app;
pub mod appliance;
pub mod authn;
pub mod backend;
pub mod cache;
pub mod catalog;
pub mod dispatch;
pub mod errors;
pub mod http;
pub mod locks;
pub mod logs;
pub mod network;
pub mod server;
pub mod storage;
pub mod tasks;
pub mod utils;
pub mod workers;
