//! Command link handling for the robot
//!
//! This module handles:
//! - Polling the command port once per tick
//! - Applying decoded commands to the session state machine
//! - Periodic discovery announcements
//! - The command timeout fail-safe

mod service;

pub use service::LinkService;
