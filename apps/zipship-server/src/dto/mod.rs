//! Data Transfer Objects

pub mod deploy;
