pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod path_utils;
pub mod sweep;
pub mod system_info;
