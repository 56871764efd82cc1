pub mod github;
pub mod job;
pub mod logger;
pub mod trust;
pub mod verify;

pub use log;
