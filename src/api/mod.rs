pub mod events;
pub mod models;
pub mod tracks;

pub use events::*;
pub use models::*;
pub use tracks::*;
