mod models;
mod types;

pub use models::*;
pub use types::*;
