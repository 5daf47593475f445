//! HTTP handlers

pub mod health;
pub mod upload;
pub mod data;
pub mod versions;
pub mod analysis;
pub mod export;
