//! different utility modules used throughout the project
/// tiny module to set up combined terminal + file logging
pub mod logger;
/// tiny module to get system information - a pretty-printing wrapper around famous sys-info crate,
/// useful for interpreting benchmark numbers across machines
pub mod sys_info;
