mod capability;
mod config;
mod events;
mod model;
mod util;

pub use capability::*;
pub use config::*;
pub use events::*;
pub use model::*;
pub use util::*;
