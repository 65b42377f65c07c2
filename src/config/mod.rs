pub mod args;
mod r#impl;
mod structs;

pub use args::{Cli, Commands};
pub use r#impl::{get_config, init_config, update_config};
pub use structs::*;
