//! Biomedical named-entity recognition with UMLS concept linking, served
//! over HTTP.

pub mod config;
pub mod dtos;
pub mod handlers;
pub mod services;
pub mod startup;
pub mod utils;
