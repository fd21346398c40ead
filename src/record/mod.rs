//! Result assembly.
//!
//! `ResultBuilder` turns merged chain output, blocked-policy information, and
//! the elapsed analysis time into the immutable `RedirectChainResult`.

mod builder;

pub use builder::ResultBuilder;
