pub mod app;
pub mod bucket;
pub mod config;
pub mod discovery;
pub mod domain;
pub mod em_metadata;
pub mod error;
pub mod grid;
pub mod output;
pub mod piramid;
pub mod segmentation;
pub mod store;
pub mod tile;
pub mod viewer;
