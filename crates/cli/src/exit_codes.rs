//! CLI Exit Code Registry
//!
//! Single source of truth for `smatch` exit codes. Exit codes are part of
//! the shell contract — scripts rely on them.
//!
//! | Code | Meaning                                      |
//! |------|----------------------------------------------|
//! | 0    | Success                                      |
//! | 1    | General error (unspecified)                  |
//! | 2    | CLI usage error (bad args)                   |
//! | 3    | Invalid config (TOML or validation failure)  |
//! | 4    | Runtime error (missing files, bad CSV, i/o)  |

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// General error - unspecified failure.
/// Avoid using this; prefer a specific error code.
pub const EXIT_ERROR: u8 = 1;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Config failed to parse or validate.
pub const EXIT_INVALID_CONFIG: u8 = 3;

/// Runtime failure: unreadable input, malformed CSV, write errors.
pub const EXIT_RUNTIME: u8 = 4;
