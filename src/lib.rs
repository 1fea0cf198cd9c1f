pub mod cli;
pub mod config;
pub mod index;
pub mod job;
pub mod pipeline;
pub mod source;
pub mod storage;
pub mod web;
