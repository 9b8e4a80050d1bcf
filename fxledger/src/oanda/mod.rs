pub mod objects;
pub use objects::*;

pub mod helpers;

pub mod pricing_api;
pub use pricing_api::*;

pub mod errors;
