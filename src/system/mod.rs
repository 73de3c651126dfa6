//! Integration with the operating system: instance detection and login autostart.

pub mod autostart;
pub mod singleton;
