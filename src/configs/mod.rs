pub mod base;
pub mod server;
pub mod session;

pub use base::*;
pub use server::*;
pub use session::*;
