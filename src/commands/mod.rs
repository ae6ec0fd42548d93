mod analyze;
mod init;

pub use analyze::cmd_analyze;
pub use init::{cmd_init, cmd_init_with_fs};
