// lib.rs - S3Hunter scanning engine
// Purpose: Enumerate readable objects in public buckets with bounded concurrent probing

pub mod catalog;
pub mod config;
pub mod filter;
pub mod jobs;
pub mod limiter;
pub mod output;
pub mod probe;
pub mod scanner;
pub mod stats;
pub mod targets;
pub mod worker;
