pub mod config;
pub mod currency;
pub mod dataset;
pub mod export;
pub mod features;
pub mod forest;
pub mod logging;
pub mod metrics;
pub mod model;
pub mod predict;
pub mod report;
pub mod split;
pub mod state;
pub mod tree;
