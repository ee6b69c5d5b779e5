//! Exit codes of the `ddcc` binary.
//! Scripts branch on these, so they are part of the public contract.

pub const VERIFIED: i32 = 0;
pub const REJECTED: i32 = 1; // Credential rejected, kid not trusted, or a trust source failed
pub const CONFIG_ERROR: i32 = 2; // Bad arguments, unreadable input, or client setup failure
