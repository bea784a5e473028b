pub mod detection;
pub mod location;
pub mod time;

pub use detection::*;
pub use location::*;
pub use time::*;
