// Constants for the command-line shell

use crate::interpreter::constants::IMPLEMENTATION_VERSION;

/// An argument could not be parsed.
pub const EXIT_USAGE: i32 = 2;

/// At least one error (not warning) was reported.
pub const EXIT_RUNTIME_ERROR: i32 = 3;

/// A script file could not be opened.
pub const EXIT_FILE_NOT_FOUND: i32 = 4;

/// Prompt shown before the first line of an interactive unit.
pub const PROMPT: &str = "js> ";

/// Prompt shown while a unit is still incomplete.
pub const CONTINUATION_PROMPT: &str = "";

/// Filename attached to units typed at the prompt.
pub const INTERACTIVE_FILENAME: &str = "typein";

/// Size of the interactive line buffer, terminator included. Longer lines
/// arrive in several pieces.
pub const LINE_BUFFER_SIZE: usize = 256;

/// Branch counts whose low bits are all set trigger an opportunistic
/// collection.
pub const BRANCH_GC_MASK: u32 = 0x3fff;

pub const USAGE: &str = "usage: minjs [-PswW] [-b branchlimit] [-c stackchunksize] [-v version] [-f scriptfile] [-S maxstacksize] [scriptfile] [scriptarg...]";

/// The full text printed on a usage error.
pub fn usage_text() -> String {
    format!("{}\n{}\n", IMPLEMENTATION_VERSION, USAGE)
}

/// Stack reserved for the thread that runs scripts. Script recursion nests
/// evaluator frames, so the platform default is too small.
pub const SHELL_STACK_SIZE: usize = 256 * 1024 * 1024;
