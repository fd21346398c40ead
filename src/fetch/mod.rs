//! HTTP redirect following.
//!
//! This module handles:
//! - Browser-like request headers and the HEAD/GET hop primitive
//! - Manual redirect chain resolution with loop and hop-cap detection

mod redirects;
mod request;

pub use redirects::{
    follow_redirects, FollowOutcome, FollowTerminal, VisitedSet, HTTP_LOCATION_METHOD,
};
pub use request::{probe, HopMethod, HopResponse};
pub(crate) use request::RequestHeaders;
