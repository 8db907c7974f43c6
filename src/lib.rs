pub mod config;
pub mod historical;
pub mod logging;
pub mod report;
pub mod volume_profile;
