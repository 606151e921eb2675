//! Request handlers.

pub mod assets;
pub mod generate;
pub mod generations;
pub mod health;
pub mod upload;

pub use assets::*;
pub use generate::*;
pub use generations::*;
pub use health::*;
pub use upload::*;
