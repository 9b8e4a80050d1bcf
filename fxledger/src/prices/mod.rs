pub mod cache;
pub mod resolver;

pub use cache::PriceCache;
pub use resolver::*;
