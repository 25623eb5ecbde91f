//! Library half of `wsmux-client`: configuration loading for the binary.

pub mod config;
