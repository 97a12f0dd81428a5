//! Wire models for the virtualization gateway API

pub mod models;
