pub mod config;
pub mod error;
pub mod feed;
pub mod fetch;
pub mod model;
pub mod output;
pub mod parser;

pub use error::FeedError;
pub use feed::{Agency, FeedClient};
