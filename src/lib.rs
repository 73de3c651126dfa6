//! Console reminder that nudges you to drink water every hour and keeps a daily log of how much
//! you drank. One `run` instance owns the files and the timer, the other commands are one-shot
//! helpers for checking and editing the log.

pub mod cli;
pub mod fs;
pub mod intake;
pub mod reminder;
pub mod storage;
pub mod system;
pub mod utils;
pub mod window_api;
