pub mod api;
pub mod integration;
pub mod model;
pub mod ws;

pub use api::Error;
