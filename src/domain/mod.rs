pub mod area_profile;
pub mod filters;
pub mod intent;
pub mod place;
pub mod screen;
pub mod session;

pub use area_profile::*;
pub use filters::*;
pub use intent::*;
pub use place::*;
pub use screen::*;
pub use session::*;
