//! phantom-jam - DBSCAN phantom traffic jam detection
//!
//! This library provides the offline detector trainer (stratified split,
//! standardization, DBSCAN core-point reference set, distance threshold and
//! evaluation), persistence of the fitted model, and the segment query
//! service that serves traffic rows by road segment over HTTP.

pub mod cli;
pub mod config;
pub mod dataset;
pub mod detector;
pub mod model_persistence;
pub mod segment;
pub mod split;
