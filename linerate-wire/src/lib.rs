pub mod line;
pub mod timestamp;

pub use line::{Codec, Error};
pub use timestamp::strip_timestamp;
