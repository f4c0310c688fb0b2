//! The command-line shell
//!
//! - [`args`]: command-line parsing into ordered actions
//! - [`session`]: streams, exit code and quit flag; the engine's host
//! - [`driver`]: runs files and the interactive loop
//! - [`diagnostics`]: report rendering
//! - [`guard`]: branch and stack limits
//! - [`builtins`]: `print`, `load`, `quit`, `gc`, `read`, `version`
//! - [`source`]: shebang skipping and bounded line reads

pub mod args;
pub mod builtins;
pub mod constants;
pub mod diagnostics;
pub mod driver;
pub mod guard;
pub mod session;
pub mod source;

pub use driver::Shell;
pub use session::Session;
