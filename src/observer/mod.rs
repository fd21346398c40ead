//! Page-level redirect observation.
//!
//! Detects redirects a plain HTTP request cannot see: refresh directives and
//! script-initiated navigation. The pieces:
//! - `page` - the simulated browsing context that loads documents and navigates
//! - `actor` - the single-writer observer that owns all detection state
//! - `bridge` - correlation-id request/reply handoff with a reply timeout
//! - `refresh`, `document` - directive parsing and script scanning
//! - `interceptor` - optional navigation API hooks
//! - `confirm` - retrospective evidence and similarity analysis

mod actor;
mod bridge;
mod confirm;
mod document;
mod events;
mod interceptor;
mod page;
mod refresh;
mod state;

pub use bridge::{ObserverHandle, ReplyRouter};
pub use confirm::{is_exact_target_match, is_filename_similar, is_path_prefix_match};
pub use document::{NavigationApi, PageDocument, ScriptNavigation};
pub use events::{PageEvent, Trigger};
pub use interceptor::{
    EnvironmentCapabilities, HistoryApiInterceptor, InstalledInterceptors, InterceptedCall,
    LocationMethodInterceptor, LocationSetterInterceptor, NavigationInterceptor,
};
pub use page::{FetchedPage, HttpPageLoader, PageLoader, PageObservation, PageSession};
pub use refresh::{extract_refresh_directive, parse_refresh_content, ParsedRefresh};
pub use state::ObserverReport;
