pub mod collections;
pub mod common;
pub mod conflicts;
pub mod pull;
pub mod push;
