pub mod ban;
pub mod initialize;
pub mod install;
pub mod pause;

pub use ban::*;
pub use initialize::*;
pub use install::*;
pub use pause::*;
