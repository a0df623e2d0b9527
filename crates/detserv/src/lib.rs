//! Top-level facade crate for detserv.
//!
//! Re-exports core types and the server library so users can depend on a single crate.

pub mod core {
    pub use detserv_core::*;
}

pub mod server {
    pub use detserv_server::*;
}
