pub mod animation;
pub mod config;
pub mod geometry;
pub mod layout;
pub mod metrics;
pub mod model;
pub mod reactor;
