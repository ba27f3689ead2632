//! HTTP surface of the chess review service: position analysis, engine and
//! coordinated full-game reviews, and the PGN-or-URL accuracy endpoint.

pub mod analysis_service;
pub mod backend;
pub mod clients;
pub mod config;
pub mod error;
pub mod position_cache;
pub mod routes;
