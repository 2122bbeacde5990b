pub mod codec;
pub mod compare;
pub mod digest;
pub mod render;
pub mod run;

pub use codec::*;
pub use compare::*;
pub use digest::*;
pub use render::*;
pub use run::*;
