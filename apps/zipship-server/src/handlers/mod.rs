//! HTTP handlers

pub mod deploy;
pub mod form;
