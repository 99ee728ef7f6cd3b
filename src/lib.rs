pub mod config;
pub mod decoder;
pub mod detector;
pub mod formation;
pub mod geo;
pub mod metrics;
pub mod pipeline;
pub mod store;
pub mod web;
