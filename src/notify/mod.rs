mod provider;
mod template;

use std::{
    collections::HashSet,
    sync::{Arc, Mutex, PoisonError},
};

use futures_util::future::join_all;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{Config, ConfigError, NotifierKind},
    rooms::Room,
};

pub use provider::ProviderNotifier;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("mail transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("mail provider answered {status}: {body}")]
    Rejected {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error("{0} refused the message")]
    Refused(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub html: String,
}

/// Keeps every message in memory instead of sending it.
#[derive(Clone, Default)]
pub struct TestNotifier {
    sent: Arc<Mutex<Vec<OutgoingMail>>>,
    refuse: Arc<HashSet<String>>,
}

impl TestNotifier {
    /// Fails delivery to each of `addresses`, accepts everyone else.
    pub fn refusing<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            sent: Arc::default(),
            refuse: Arc::new(addresses.into_iter().map(Into::into).collect()),
        }
    }

    pub fn sent(&self) -> Vec<OutgoingMail> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn push(&self, mail: OutgoingMail) -> Result<(), NotifyError> {
        if self.refuse.contains(&mail.to) {
            return Err(NotifyError::Refused(mail.to));
        }
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).push(mail);
        Ok(())
    }
}

/// Outbound email, chosen once at startup.
#[derive(Clone)]
pub enum Notifier {
    /// Writes each message to the log.
    Console,
    Test(TestNotifier),
    Provider(ProviderNotifier),
}

impl Notifier {
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Ok(match config.notifier {
            NotifierKind::Console => Notifier::Console,
            NotifierKind::Test => Notifier::Test(TestNotifier::default()),
            NotifierKind::Provider => {
                let mail = config.mail.clone().ok_or(ConfigError::Missing("MAIL_API_URL"))?;
                Notifier::Provider(ProviderNotifier::new(mail))
            }
        })
    }

    pub fn name(&self) -> &'static str {
        match self {
            Notifier::Console => "console",
            Notifier::Test(_) => "test",
            Notifier::Provider(_) => "provider",
        }
    }

    pub async fn send(&self, to: &str, subject: &str, html: &str) -> Result<(), NotifyError> {
        match self {
            Notifier::Console => {
                info!(to, subject, body_len = html.len(), "email (console)");
                Ok(())
            }
            Notifier::Test(outbox) => outbox.push(OutgoingMail {
                to: to.to_owned(),
                subject: subject.to_owned(),
                html: html.to_owned(),
            }),
            Notifier::Provider(provider) => provider.send(to, subject, html).await,
        }
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct NotificationReport {
    pub delivered: Vec<String>,
    pub failed: Vec<String>,
}

/// Tells everyone in a decided room who won. An address listed more than once
/// still gets one message. Best effort: each failure is logged against its
/// recipient and nothing is retried.
pub async fn announce_winner(notifier: Notifier, room: Room) -> NotificationReport {
    let Some(winner) = room.winner.as_deref() else {
        warn!(room_id = %room.id, "announce requested for a room without a winner");
        return NotificationReport::default();
    };

    let description = template::description_html(&room.description);
    let mut seen = HashSet::new();
    let recipients = room.participants.iter().filter(|&to| seen.insert(to.as_str()));
    let sends = recipients.map(|to| {
        let mail = if to == winner {
            template::winner_mail(&room, winner, &description)
        } else {
            template::result_mail(&room, winner, &description)
        };
        let notifier = &notifier;
        async move {
            let outcome = notifier.send(to, &mail.subject, &mail.html).await;
            (to.clone(), outcome)
        }
    });

    let mut report = NotificationReport::default();
    for (to, outcome) in join_all(sends).await {
        match outcome {
            Ok(()) => report.delivered.push(to),
            Err(err) => {
                warn!(room_id = %room.id, recipient = %to, error = %err, "notification failed");
                report.failed.push(to);
            }
        }
    }

    info!(
        room_id = %room.id,
        delivered = report.delivered.len(),
        failed = report.failed.len(),
        "winner announced"
    );
    report
}
