// Constants for the script engine

/// Banner printed above the usage text.
pub const IMPLEMENTATION_VERSION: &str = concat!("minjs ", env!("CARGO_PKG_VERSION"));

/// Default language version; accepts every supported construct.
pub const DEFAULT_VERSION: u32 = 0;

/// First language version in which `let` and `const` are reserved words.
pub const LET_CONST_VERSION: u32 = 170;

/// Default number of allocations between opportunistic collections.
pub const DEFAULT_STACK_CHUNK_SIZE: usize = 8192;

/// Nesting bound for script function calls, independent of the native
/// stack limit. Sized for the shell thread's stack, not the platform default.
pub const MAX_CALL_DEPTH: usize = 3000;

/// The native stack grows towards lower addresses on every supported target.
pub const STACK_GROWS_DOWN: bool = true;
