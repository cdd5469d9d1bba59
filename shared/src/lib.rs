pub mod cache;
pub mod eth;
pub mod grid;
pub mod meta;

pub use cache::*;
pub use eth::*;
pub use grid::*;
pub use meta::*;
