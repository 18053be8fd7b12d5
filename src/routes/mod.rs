/// Router Module Index
///
/// Splits the gateway's routes by how they are guarded. Access control is attached at the
/// module level, so a page cannot be registered without passing through the gate.

/// Pages anyone may open, with or without a session.
pub mod public;

/// Login, logout and session introspection. Ungated; they manage the token the gate reads.
pub mod session;

/// Every page behind the access gate, including the fallback for unregistered paths.
pub mod pages;
