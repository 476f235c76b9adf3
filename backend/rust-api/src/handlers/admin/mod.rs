mod content;
mod users;

pub use content::*;
pub use users::*;
