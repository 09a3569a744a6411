//! HTTP adapter over the TriSent prediction service

pub mod api;
pub mod config;
