//! Wire models for the vLab ICAP HTTP API

pub mod models;
