pub mod classifier;
pub mod sentiment;
pub mod trading_signal;

pub use classifier::*;
pub use sentiment::*;
pub use trading_signal::*;
