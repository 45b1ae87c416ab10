//! Submission state and the pure reducer that advances it.
//!
//! Front ends hold one [`SubmissionState`] and feed every user action and
//! request settlement through [`reduce`]. The reducer never performs I/O; the
//! request itself runs elsewhere and reports back with
//! [`SubmissionEvent::Settled`].

use std::time::{Duration, Instant};

use shared::domain::{FieldUpdate, FormFields, Notification, StatementFile};

use crate::error::SubmissionError;

pub const NOTIFICATION_DISPLAY_DURATION: Duration = Duration::from_secs(6);
pub const SUCCESS_MESSAGE: &str = "K4 form processed successfully!";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    InFlight,
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveNotification {
    pub notification: Notification,
    pub shown_at: Instant,
}

impl ActiveNotification {
    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) >= NOTIFICATION_DISPLAY_DURATION
    }
}

/// How an accepted submission ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Delivered { file_name: String, size_bytes: usize },
    Failed(SubmissionError),
}

impl SubmissionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SubmissionOutcome::Delivered { .. })
    }

    pub fn notification(&self) -> Notification {
        match self {
            SubmissionOutcome::Delivered { .. } => Notification::success(SUCCESS_MESSAGE),
            SubmissionOutcome::Failed(err) => Notification::error(err.user_message()),
        }
    }
}

#[derive(Debug, Clone)]
pub enum SubmissionEvent {
    FieldChanged(FieldUpdate),
    FileSelected(Option<StatementFile>),
    SubmitStarted,
    Settled {
        outcome: SubmissionOutcome,
        at: Instant,
    },
    NotificationDismissed,
    Tick(Instant),
}

#[derive(Debug, Clone, Default)]
pub struct SubmissionState {
    pub fields: FormFields,
    pub file: Option<StatementFile>,
    pub request: RequestState,
    pub notification: Option<ActiveNotification>,
}

impl SubmissionState {
    pub fn new(fields: FormFields) -> Self {
        Self {
            fields,
            ..Default::default()
        }
    }

    pub fn is_busy(&self) -> bool {
        self.request == RequestState::InFlight
    }

    /// Submission needs a selected file and no request in flight.
    pub fn can_submit(&self) -> bool {
        self.file.is_some() && !self.is_busy()
    }

    pub fn visible_notification(&self) -> Option<&Notification> {
        self.notification.as_ref().map(|active| &active.notification)
    }
}

pub fn reduce(state: SubmissionState, event: SubmissionEvent) -> SubmissionState {
    match event {
        SubmissionEvent::FieldChanged(update) => SubmissionState {
            fields: state.fields.with_update(update),
            ..state
        },
        SubmissionEvent::FileSelected(file) => SubmissionState { file, ..state },
        SubmissionEvent::SubmitStarted if state.can_submit() => SubmissionState {
            request: RequestState::InFlight,
            ..state
        },
        SubmissionEvent::SubmitStarted => state,
        SubmissionEvent::Settled { outcome, at } if state.is_busy() => SubmissionState {
            request: RequestState::Settled,
            notification: Some(ActiveNotification {
                notification: outcome.notification(),
                shown_at: at,
            }),
            ..state
        },
        // Nothing is in flight, so this report belongs to no request.
        SubmissionEvent::Settled { .. } => state,
        SubmissionEvent::NotificationDismissed => SubmissionState {
            notification: None,
            ..state
        },
        SubmissionEvent::Tick(now) => {
            let expired = state
                .notification
                .as_ref()
                .is_some_and(|active| active.is_expired(now));
            if expired {
                SubmissionState {
                    notification: None,
                    ..state
                }
            } else {
                state
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/state_tests.rs"]
mod tests;
