pub mod blacklist;
pub mod initialize;
pub mod max_amount;

pub use blacklist::*;
pub use initialize::*;
pub use max_amount::*;
