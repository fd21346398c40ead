//! The page environment: a simulated browsing context.
//!
//! It loads documents, publishes its location through a watch channel, carries
//! out the navigation a page asks for, and reports what happens as page events.
//! It never tells the observer which mechanism moved it; the observer works that
//! out from events and location snapshots.

use std::future::Future;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use url::Url;

use super::bridge::ObserverHandle;
use super::document::{NavigationApi, PageDocument};
use super::events::PageEvent;
use super::interceptor::{EnvironmentCapabilities, InstalledInterceptors};
use super::state::ObserverReport;
use crate::config::{MAX_RESPONSE_BODY_SIZE, OBSERVER_REPLY_TIMEOUT, OBSERVER_SETTLE_TIME};
use crate::error_handling::{categorize_reqwest_error, AnalysisError, ErrorType};
use crate::fetch::{RequestHeaders, VisitedSet};
use crate::filter::check_blocklist;
use crate::models::AnalysisSettings;
use crate::normalize::{clean_url, same_url};

/// A document as returned by a `PageLoader`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub url: String,
    pub status: u16,
    pub location: Option<String>,
    pub html: String,
}

/// Loads documents into the page environment.
pub trait PageLoader: Send + Sync {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<FetchedPage, AnalysisError>> + Send;
}

/// Loads documents with a GET over the shared no-redirect client.
#[derive(Debug, Clone)]
pub struct HttpPageLoader {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpPageLoader {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        Self { client, timeout }
    }
}

fn body_error(url: &str, e: reqwest::Error) -> AnalysisError {
    AnalysisError::network(
        categorize_reqwest_error(&e),
        format!("Reading body of {} failed: {}", url, e),
    )
}

impl PageLoader for HttpPageLoader {
    async fn fetch(&self, url: &str) -> Result<FetchedPage, AnalysisError> {
        let mut response = RequestHeaders::apply_to_request_builder(self.client.get(url))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| {
                AnalysisError::network(
                    ErrorType::PageLoadError,
                    format!("Loading {} failed: {}", url, e),
                )
            })?;

        let status = response.status().as_u16();
        let location = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(|e| body_error(url, e))? {
            let remaining = MAX_RESPONSE_BODY_SIZE - body.len();
            if chunk.len() >= remaining {
                body.extend_from_slice(&chunk[..remaining]);
                debug!("Truncated body of {} at {} bytes", url, MAX_RESPONSE_BODY_SIZE);
                break;
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            url: url.to_string(),
            status,
            location,
            html: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}

/// Everything a page session produced.
#[derive(Debug, Clone)]
pub struct PageObservation {
    pub report: ObserverReport,
    /// Set when a document could not be loaded; the report still holds what was seen
    pub load_error: Option<AnalysisError>,
    /// A refresh directive was still waiting when the session ended
    pub refresh_unconfirmed: bool,
    pub late_replies: usize,
}

/// Where the environment goes after a document has run.
enum NextNavigation {
    Navigate(String),
    Settled,
    RefreshOutOfWindow,
}

/// Runs one page session: loads the start page and lets it navigate.
pub struct PageSession<'a, L: PageLoader> {
    loader: &'a L,
    settings: &'a AnalysisSettings,
    capabilities: EnvironmentCapabilities,
    reply_timeout: Duration,
    http_budget: usize,
}

impl<'a, L: PageLoader> PageSession<'a, L> {
    pub fn new(loader: &'a L, settings: &'a AnalysisSettings) -> Self {
        Self {
            loader,
            settings,
            capabilities: EnvironmentCapabilities::default(),
            reply_timeout: OBSERVER_REPLY_TIMEOUT,
            http_budget: settings.max_redirects,
        }
    }

    pub fn with_capabilities(mut self, capabilities: EnvironmentCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    pub fn with_reply_timeout(mut self, reply_timeout: Duration) -> Self {
        self.reply_timeout = reply_timeout;
        self
    }

    /// Caps the HTTP hops the page may still take, for sessions that start
    /// where the follower already spent part of `max_redirects`.
    pub fn with_http_budget(mut self, http_budget: usize) -> Self {
        self.http_budget = http_budget.min(self.settings.max_redirects);
        self
    }

    /// Observes the page at `start_url` until it settles.
    ///
    /// The environment stops when a page has nothing left to do, when it
    /// revisits a URL, when it reaches a blocklisted host (which is never
    /// loaded), after `max_redirects` navigations, when the next HTTP
    /// hop would exceed the HTTP budget, or when a refresh delay exceeds the
    /// analysis timeout.
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ObserverTimeout` if the observer's final report
    /// cannot be collected. Page load failures are reported in
    /// `PageObservation::load_error` instead.
    pub async fn observe(&self, start_url: &str) -> Result<PageObservation, AnalysisError> {
        let start = clean_url(start_url);
        let (location_tx, location_rx) = watch::channel(start.clone());
        let observer = ObserverHandle::spawn(&start, location_rx, self.reply_timeout);

        let interceptors = InstalledInterceptors::install(&self.capabilities);
        for name in &interceptors.unavailable {
            observer.send(PageEvent::HeuristicUnavailable {
                name: (*name).to_string(),
            });
        }

        let mut visited = VisitedSet::new();
        let mut current = start;
        let mut navigations = 0usize;
        let mut http_hops = 0usize;
        let mut load_error = None;
        let mut refresh_unconfirmed = false;

        loop {
            if !visited.insert(&current) {
                debug!("Page environment returned to {}; stopping", current);
                break;
            }
            if let Some(blocked) = check_blocklist(&current) {
                info!(
                    "Page environment will not load {} ({}: {})",
                    current, blocked.service, blocked.reason
                );
                break;
            }

            let page = match self.loader.fetch(&current).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("Page environment could not load {}: {}", current, e);
                    load_error = Some(e);
                    break;
                }
            };
            let base = match Url::parse(&current) {
                Ok(base) => base,
                Err(_) => {
                    load_error = Some(AnalysisError::MalformedUrl(current.clone()));
                    break;
                }
            };

            if (300..400).contains(&page.status) {
                let Some(target) = page
                    .location
                    .as_deref()
                    .and_then(|location| base.join(location).ok())
                    .map(|u| u.to_string())
                else {
                    debug!("{} answered {} without a usable Location", current, page.status);
                    break;
                };
                if http_hops >= self.http_budget || navigations >= self.settings.max_redirects {
                    debug!(
                        "Page environment stops at {} after {} HTTP hop(s)",
                        current, http_hops
                    );
                    break;
                }
                observer.send(PageEvent::HttpHop {
                    from: current.clone(),
                    to: target.clone(),
                    status: page.status,
                });
                location_tx.send_replace(target.clone());
                current = target;
                navigations += 1;
                http_hops += 1;
                continue;
            }

            let document = PageDocument::parse(&page.html, &base);
            observer.send(PageEvent::Loaded {
                location: current.clone(),
                status: page.status,
                document: document.clone(),
            });

            if navigations >= self.settings.max_redirects {
                debug!("Page environment reached {} navigations", navigations);
                break;
            }

            match self
                .run_document(&document, &current, &observer, &location_tx, &interceptors)
                .await
            {
                NextNavigation::Navigate(target) => {
                    current = target;
                    navigations += 1;
                }
                NextNavigation::Settled => break,
                NextNavigation::RefreshOutOfWindow => {
                    refresh_unconfirmed = true;
                    break;
                }
            }
        }

        tokio::time::sleep(OBSERVER_SETTLE_TIME).await;
        let report = observer.finish().await?;
        info!(
            "Observed {} page-level step(s), final location {}",
            report.steps.len(),
            report.final_location
        );
        Ok(PageObservation {
            report,
            load_error,
            refresh_unconfirmed,
            late_replies: observer.late_replies(),
        })
    }

    /// Executes what a loaded document asks for, in browser order: inline
    /// scripts first, then the refresh directive if nothing unloaded the page.
    ///
    /// Events are always queued before the location snapshot changes.
    async fn run_document(
        &self,
        document: &PageDocument,
        current: &str,
        observer: &ObserverHandle,
        location: &watch::Sender<String>,
        interceptors: &InstalledInterceptors,
    ) -> NextNavigation {
        for navigation in &document.script_navigations {
            if let Some(call) = interceptors.intercept(navigation) {
                observer.send(PageEvent::NavigationIntercepted(call));
            }
            let target = navigation.target_url.clone();
            match navigation.api {
                NavigationApi::HashSetter => {
                    let old_url = location.borrow().clone();
                    observer.send(PageEvent::HashChanged {
                        old_url,
                        new_url: target.clone(),
                    });
                    location.send_replace(target);
                }
                NavigationApi::PushState | NavigationApi::ReplaceState => {
                    location.send_replace(target);
                }
                NavigationApi::LocationSetter
                | NavigationApi::LocationAssign
                | NavigationApi::LocationReplace => {
                    observer.send(PageEvent::BeforeUnload {
                        location: target.clone(),
                    });
                    location.send_replace(target.clone());
                    return NextNavigation::Navigate(target);
                }
            }
        }

        let refresh = match &document.refresh {
            Some(refresh) => refresh.clone(),
            None => match document.injected_refreshes.first() {
                Some(injected) => {
                    observer.send(PageEvent::StructureChanged {
                        directive: injected.clone(),
                    });
                    injected.clone()
                }
                None => return NextNavigation::Settled,
            },
        };

        if same_url(&refresh.target_url, current) {
            debug!("{} refreshes itself; treating as settled", current);
            return NextNavigation::Settled;
        }
        if refresh.delay_seconds.saturating_mul(1000) > self.settings.timeout_ms {
            debug!(
                "Refresh to {} after {}s is beyond the {}ms window",
                refresh.target_url, refresh.delay_seconds, self.settings.timeout_ms
            );
            return NextNavigation::RefreshOutOfWindow;
        }

        if refresh.delay_seconds > 0 {
            tokio::time::sleep(Duration::from_secs(refresh.delay_seconds)).await;
            observer.send(PageEvent::VisibilityRegained {
                document: document.clone(),
            });
        }
        observer.send(PageEvent::BeforeUnload {
            location: refresh.target_url.clone(),
        });
        location.send_replace(refresh.target_url.clone());
        NextNavigation::Navigate(refresh.target_url)
    }
}
