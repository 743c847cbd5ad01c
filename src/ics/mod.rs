pub mod client;
pub mod filter;
pub mod model;
pub mod parse;
