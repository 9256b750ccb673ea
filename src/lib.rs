//! HRMS Lite client: employee and attendance records served by the HRMS
//! backend, with a durable local store standing in when it is unreachable.

pub mod commands;
pub mod config;
pub mod fallback;
pub mod hrms;
pub mod logging;
