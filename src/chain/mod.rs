//! Chain assembly.
//!
//! This module provides:
//! - Domain and protocol change tracking (`ChainFlags`)
//! - Merging of HTTP follower steps and page observer steps (`merge_chain`)

mod flags;
mod merge;

pub use flags::ChainFlags;
pub use merge::{merge_chain, MergedChain, FINAL_LOCATION_METHOD};
