pub mod codec;
pub mod sha256;

pub use codec::*;
pub use sha256::*;
