//! Navigation API interception.
//!
//! Interceptors are optional. Each one tries to install itself into the page
//! environment; environments whose navigation properties are not configurable
//! refuse the install, and the observer falls back to its event monitors and
//! location polling for those APIs.

use log::{debug, warn};

use super::document::{NavigationApi, ScriptNavigation};

/// What the page environment allows the observer to redefine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentCapabilities {
    /// `location` setter and `location.href` can be wrapped
    pub location_setter_configurable: bool,
    /// `location.assign` and `location.replace` can be wrapped
    pub location_methods_configurable: bool,
    /// `history.pushState` and `history.replaceState` can be wrapped
    pub history_configurable: bool,
}

impl Default for EnvironmentCapabilities {
    fn default() -> Self {
        Self {
            location_setter_configurable: true,
            location_methods_configurable: true,
            history_configurable: true,
        }
    }
}

impl EnvironmentCapabilities {
    /// An environment where nothing can be intercepted.
    pub fn locked_down() -> Self {
        Self {
            location_setter_configurable: false,
            location_methods_configurable: false,
            history_configurable: false,
        }
    }
}

/// A navigation call reported by an installed interceptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterceptedCall {
    pub interceptor: &'static str,
    pub api: NavigationApi,
    pub target_url: String,
}

/// Hooks one family of navigation APIs.
pub trait NavigationInterceptor: Send {
    fn name(&self) -> &'static str;

    /// Attempts installation. Returns `false` when the environment refuses it.
    fn try_install(&mut self, capabilities: &EnvironmentCapabilities) -> bool;

    /// Reports the call if this interceptor is installed and covers its API.
    fn intercept(&self, navigation: &ScriptNavigation) -> Option<InterceptedCall>;
}

macro_rules! interceptor {
    ($ty:ident, $name:literal, $capability:ident, $($api:pat),+) => {
        #[derive(Debug, Default)]
        pub struct $ty {
            installed: bool,
        }

        impl NavigationInterceptor for $ty {
            fn name(&self) -> &'static str {
                $name
            }

            fn try_install(&mut self, capabilities: &EnvironmentCapabilities) -> bool {
                self.installed = capabilities.$capability;
                self.installed
            }

            fn intercept(&self, navigation: &ScriptNavigation) -> Option<InterceptedCall> {
                if !self.installed || !matches!(navigation.api, $($api)|+) {
                    return None;
                }
                Some(InterceptedCall {
                    interceptor: $name,
                    api: navigation.api,
                    target_url: navigation.target_url.clone(),
                })
            }
        }
    };
}

interceptor!(
    LocationSetterInterceptor,
    "location_setter",
    location_setter_configurable,
    NavigationApi::LocationSetter,
    NavigationApi::HashSetter
);
interceptor!(
    LocationMethodInterceptor,
    "location_methods",
    location_methods_configurable,
    NavigationApi::LocationAssign,
    NavigationApi::LocationReplace
);
interceptor!(
    HistoryApiInterceptor,
    "history_api",
    history_configurable,
    NavigationApi::PushState,
    NavigationApi::ReplaceState
);

/// The interceptors that installed, plus the names of those that did not.
pub struct InstalledInterceptors {
    interceptors: Vec<Box<dyn NavigationInterceptor>>,
    pub unavailable: Vec<&'static str>,
}

impl InstalledInterceptors {
    /// Tries every interceptor in sequence against the environment.
    pub fn install(capabilities: &EnvironmentCapabilities) -> Self {
        let candidates: Vec<Box<dyn NavigationInterceptor>> = vec![
            Box::new(LocationSetterInterceptor::default()),
            Box::new(LocationMethodInterceptor::default()),
            Box::new(HistoryApiInterceptor::default()),
        ];

        let mut interceptors = Vec::new();
        let mut unavailable = Vec::new();
        for mut interceptor in candidates {
            if interceptor.try_install(capabilities) {
                debug!("Installed {} interceptor", interceptor.name());
                interceptors.push(interceptor);
            } else {
                warn!(
                    "Could not install {} interceptor; falling back to event monitors",
                    interceptor.name()
                );
                unavailable.push(interceptor.name());
            }
        }
        Self {
            interceptors,
            unavailable,
        }
    }

    /// First installed interceptor that reports the call.
    pub fn intercept(&self, navigation: &ScriptNavigation) -> Option<InterceptedCall> {
        self.interceptors
            .iter()
            .find_map(|interceptor| interceptor.intercept(navigation))
    }

    pub fn installed_count(&self) -> usize {
        self.interceptors.len()
    }
}
