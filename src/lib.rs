// src/lib.rs

//! Movies API Library

pub mod api;
pub mod config;
pub mod error;
#[cfg(feature = "lambda")]
pub mod lambda;
pub mod models;
pub mod service;
pub mod storage;
pub mod summary;
