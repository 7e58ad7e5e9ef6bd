//! One module per subcommand.

pub mod facts;
pub mod init;
pub mod log;
pub mod resolve;
pub mod reviews;
pub mod submit;
