mod entities;
mod payload;
mod ports;

pub use entities::*;
pub use payload::*;
pub use ports::*;
