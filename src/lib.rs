//! HETS Rotation Engine
//!
//! Seniority rotation lists for the Hired Equipment Tracking System: the
//! order in which equipment owners of a local area are offered work, and the
//! "ask next" pointer that carries that order from one rental request to the
//! next within a fiscal year.

pub mod config;
pub mod error;
pub mod models;
pub mod repository;
pub mod rotation;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorCode};
