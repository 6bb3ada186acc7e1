pub mod job;
pub mod lead;
pub mod media;
pub mod message;
pub mod session;
pub mod tenant;
