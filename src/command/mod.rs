pub mod types;
pub mod validator;

pub use types::{Command, CommandDescriptor};
pub use validator::validate;
