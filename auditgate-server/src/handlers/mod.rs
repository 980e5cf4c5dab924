//! HTTP request handlers organized by functionality

pub mod breakers;
pub mod exports;
pub mod health;
pub mod jobs;
pub mod reviews;
