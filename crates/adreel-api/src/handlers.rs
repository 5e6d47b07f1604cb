//! Request handlers.

pub mod batches;
pub mod cancel;
pub mod health;
pub mod intake;
pub mod worker;

pub use batches::*;
pub use cancel::*;
pub use health::*;
pub use intake::*;
pub use worker::*;
