pub mod annotation;
pub mod app;
pub mod bundle;
pub mod cluster;
pub mod config;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod genus;
pub mod output;
pub mod projection;
pub mod registry;
pub mod sink;
pub mod structures;
