//! Tenant Reset - prunes a demo environment back to its allow-listed organizations and users.

pub mod config;
pub mod jobs;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod startup;
