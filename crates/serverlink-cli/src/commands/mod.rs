pub mod get;
pub mod serve;
pub mod wait;
