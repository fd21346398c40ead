//! The observer actor.
//!
//! One tokio task owns the `DetectionState`. Page events, refresh timers, and
//! location polls all arrive as messages; nothing else ever touches the state.

use std::time::Duration;

use log::{debug, trace};
use tokio::sync::{mpsc, watch};

use super::confirm::confirm_retrospectively;
use super::events::{PageEvent, Trigger};
use super::refresh::ParsedRefresh;
use super::state::{DetectionState, ObserverReport};
use crate::config::{IDLE_POLL_INTERVAL, REFRESH_TIMER_BUFFER, URGENT_POLL_INTERVAL};
use crate::models::{Mechanism, RedirectStep};
use crate::normalize::{differs_only_by_fragment, same_url};

/// Mailbox message for the observer actor.
#[derive(Debug)]
pub(crate) enum ObserverMessage {
    Event(PageEvent),
    /// Asks for the current report; `finish` runs retrospective confirmation and stops the actor
    Report { correlation_id: u64, finish: bool },
}

pub(crate) struct ObserverActor {
    state: DetectionState,
    mailbox: mpsc::UnboundedReceiver<ObserverMessage>,
    location: watch::Receiver<String>,
    replies: mpsc::UnboundedSender<(u64, ObserverReport)>,
    timer_tx: mpsc::UnboundedSender<u64>,
    timer_rx: mpsc::UnboundedReceiver<u64>,
}

/// Picks the mechanism for a location change from `from` to `to`.
fn classify(state: &DetectionState, from: &str, to: &str, trigger: Trigger) -> Mechanism {
    if trigger == Trigger::Http {
        Mechanism::Http
    } else if differs_only_by_fragment(from, to) {
        Mechanism::HashChange
    } else if state.pending_directive_for(to).is_some() {
        Mechanism::DeclarativeRefresh
    } else if trigger.is_history() {
        Mechanism::HistoryNavigation
    } else {
        Mechanism::ScriptNavigation
    }
}

impl ObserverActor {
    pub(crate) fn new(
        start_url: &str,
        mailbox: mpsc::UnboundedReceiver<ObserverMessage>,
        location: watch::Receiver<String>,
        replies: mpsc::UnboundedSender<(u64, ObserverReport)>,
    ) -> Self {
        let (timer_tx, timer_rx) = mpsc::unbounded_channel();
        Self {
            state: DetectionState::new(start_url),
            mailbox,
            location,
            replies,
            timer_tx,
            timer_rx,
        }
    }

    fn poll_interval(&self) -> Duration {
        if self.state.refresh_pending {
            URGENT_POLL_INTERVAL
        } else {
            IDLE_POLL_INTERVAL
        }
    }

    fn snapshot(&self) -> String {
        self.location.borrow().clone()
    }

    /// Runs until finished or until every sender is gone.
    pub(crate) async fn run(mut self) {
        loop {
            let poll = self.poll_interval();
            tokio::select! {
                biased;
                message = self.mailbox.recv() => match message {
                    Some(ObserverMessage::Event(event)) => self.handle_event(event),
                    Some(ObserverMessage::Report { correlation_id, finish }) => {
                        let report = if finish { self.finish() } else { self.partial() };
                        if self.replies.send((correlation_id, report)).is_err() {
                            debug!("Observer reply {} has no listener", correlation_id);
                        }
                        if finish {
                            break;
                        }
                    }
                    None => {
                        debug!("Observer mailbox closed");
                        break;
                    }
                },
                Some(generation) = self.timer_rx.recv() => self.on_refresh_timer(generation),
                _ = tokio::time::sleep(poll) => self.on_poll(),
            }
        }
    }

    fn handle_event(&mut self, event: PageEvent) {
        trace!("Observer event: {:?}", event);
        match event {
            PageEvent::Loaded {
                location,
                status,
                document,
            } => {
                self.on_location_change(&location, Trigger::Load);
                self.state.begin_page(status, document.title.clone());
                if let Some(directive) = &document.refresh {
                    self.on_directive(directive);
                }
            }
            PageEvent::StructureChanged { directive } => self.on_directive(&directive),
            PageEvent::VisibilityRegained { document } => {
                if let Some(directive) = document.effective_refresh() {
                    self.on_directive(directive);
                }
                let location = self.snapshot();
                self.on_location_change(&location, Trigger::LocationPoll);
            }
            PageEvent::BeforeUnload { location } => {
                self.on_location_change(&location, Trigger::Unload)
            }
            PageEvent::HashChanged { old_url, new_url } => {
                trace!("hashchange {} -> {}", old_url, new_url);
                self.on_location_change(&new_url, Trigger::HashEvent)
            }
            PageEvent::PopState { location } => {
                self.on_location_change(&location, Trigger::PopStateEvent)
            }
            PageEvent::NavigationIntercepted(call) => {
                debug!(
                    "{} intercepted {} to {}",
                    call.interceptor,
                    call.api.as_str(),
                    call.target_url
                );
                self.on_location_change(
                    &call.target_url,
                    Trigger::Intercept {
                        history: call.api.is_history(),
                    },
                )
            }
            PageEvent::HttpHop { from, to, status } => {
                let step = RedirectStep::new(from, to, Mechanism::Http, Trigger::Http.detection_method())
                    .with_status(status);
                self.state.push_step(step);
            }
            PageEvent::HeuristicUnavailable { name } => {
                debug!("Heuristic unavailable: {}", name);
                self.state.note_unavailable(&name);
            }
        }
    }

    fn on_directive(&mut self, directive: &ParsedRefresh) {
        let Some(generation) = self.state.record_directive(directive) else {
            return;
        };
        debug!(
            "Refresh directive to {} after {}s",
            directive.target_url, directive.delay_seconds
        );
        let wait = Duration::from_secs(directive.delay_seconds) + REFRESH_TIMER_BUFFER;
        let timer_tx = self.timer_tx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(wait).await;
            // The actor may have finished already
            let _ = timer_tx.send(generation);
        });
    }

    fn on_refresh_timer(&mut self, generation: u64) {
        if generation != self.state.refresh_generation || !self.state.refresh_pending {
            trace!("Ignoring stale refresh timer {}", generation);
            return;
        }
        let location = self.snapshot();
        self.on_location_change(&location, Trigger::RefreshTimer);
    }

    fn on_poll(&mut self) {
        let location = self.snapshot();
        self.on_location_change(&location, Trigger::LocationPoll);
    }

    fn on_location_change(&mut self, location: &str, trigger: Trigger) {
        let from = self.state.last_known_location.clone();
        if same_url(&from, location) {
            return;
        }

        let mechanism = classify(&self.state, &from, location, trigger);
        let mut step = RedirectStep::new(from.as_str(), location, mechanism, trigger.detection_method());
        if mechanism == Mechanism::DeclarativeRefresh {
            step = step.with_delay(self.state.refresh.as_ref().map(|d| d.delay_seconds));
            self.state.refresh_pending = false;
        }
        debug!(
            "{} step {} -> {} via {}",
            mechanism,
            from,
            location,
            trigger.detection_method()
        );
        self.state.push_step(step);
    }

    fn partial(&self) -> ObserverReport {
        self.state.report()
    }

    fn finish(&mut self) -> ObserverReport {
        self.on_poll();
        confirm_retrospectively(&mut self.state);
        self.state.report()
    }
}
