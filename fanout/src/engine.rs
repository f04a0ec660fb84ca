//! Fan-out engine
//!
//! The single, strictly ordered consumer of the `messages` log. For every
//! record it decodes, validates, resolves the chat's participants and
//! enqueues the message for each participant with a live session.
//!
//! Record-level failures are logged and the record is skipped; nothing that
//! happens while processing one record can stop the loop or affect another
//! record. The commit position advances after every record whatever its
//! outcome, so consumption is at-least-once relative to the log.

use log::*;
use std::sync::Arc;
use tokio::sync::mpsc::error::TrySendError;

use crate::dedup::DedupWindow;
use crate::{
    ConnectionRegistry, EchoPolicy, Error, FanOutConfig, LogRecord, MembershipResolver, MessageId,
    MessageLog, OverflowPolicy,
};

/// Delivery counts for one fanned-out record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Report {
    /// Enqueued on a live session's queue
    pub delivered: usize,
    /// Participants with no live session (or one that just closed)
    pub offline: usize,
    /// Dropped because the recipient's queue was full
    pub dropped: usize,
    /// Recipients disconnected because their queue was full
    pub evicted: usize,
}

/// Result of processing one log record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    FannedOut(Report),
    /// The record was not actionable; the error says why.
    Skipped(Error),
    /// The message id was fanned out recently and was suppressed.
    Duplicate(MessageId),
}

pub struct FanOutEngine<L> {
    log: L,
    registry: Arc<ConnectionRegistry>,
    membership: Arc<dyn MembershipResolver>,
    config: FanOutConfig,
    recent: DedupWindow,
}

impl<L> FanOutEngine<L>
where
    L: MessageLog,
{
    pub fn new(
        log: L,
        registry: Arc<ConnectionRegistry>,
        membership: Arc<dyn MembershipResolver>,
        config: FanOutConfig,
    ) -> Self {
        let recent = DedupWindow::new(config.dedup_window);
        Self {
            log,
            registry,
            membership,
            config,
            recent,
        }
    }

    /// Consume the log until it closes, processing and committing each record
    /// in order.
    pub async fn run(mut self) {
        info!(
            "Fan-out engine consuming topic {} (overflow: {}, echo: {}, dedup window: {})",
            self.log.topic(),
            self.config.overflow_policy,
            self.config.echo_policy,
            self.config.dedup_window
        );

        while let Some(record) = self.log.next_record().await {
            let offset = record.offset;

            match self.process(&record).await {
                Outcome::FannedOut(report) => debug!(
                    "Record {} fanned out: {} delivered, {} offline, {} dropped, {} evicted",
                    offset, report.delivered, report.offline, report.dropped, report.evicted
                ),
                Outcome::Skipped(e) => debug!("Record {} skipped: {}", offset, e),
                Outcome::Duplicate(message_id) => {
                    debug!("Record {} duplicates message {}", offset, message_id)
                }
            }

            // Restart-level reprocessing belongs to the log's checkpointing,
            // so a failed commit is logged and consumption continues.
            if let Err(e) = self.log.commit(offset).await {
                error!("Failed to commit offset {}: {}", offset, e);
            }
        }

        info!("Topic {} closed, fan-out engine stopping", self.log.topic());
    }

    /// Fan out a single record.
    pub async fn process(&mut self, record: &LogRecord) -> Outcome {
        let message = match messages::decode(&record.payload) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping undecodable record at offset {}: {}", record.offset, e);
                return Outcome::Skipped(Error::Decode(e));
            }
        };

        if let Err(e) = message.validate() {
            warn!(
                "Rejecting invalid message at offset {} (message {:?}): {}",
                record.offset, message.message_id, e
            );
            return Outcome::Skipped(e.into());
        }

        if self.recent.contains(&message.message_id) {
            info!(
                "Message {} at offset {} already fanned out, skipping",
                message.message_id, record.offset
            );
            return Outcome::Duplicate(message.message_id);
        }

        let participants = match self.membership.get_participants(&message.chat_id).await {
            Ok(participants) => participants,
            Err(e) => {
                warn!(
                    "Chat not found for message {}: {}",
                    message.message_id, e
                );
                return Outcome::Skipped(e);
            }
        };

        let message_id = message.message_id.clone();
        let delivery = Arc::new(message);
        let mut report = Report::default();

        for user_id in participants.iter() {
            if self.config.echo_policy == EchoPolicy::SkipSender && *user_id == delivery.sender_id
            {
                continue;
            }

            // Offline users get nothing: no buffering, no retry.
            let outbox = match self.registry.get(user_id) {
                Ok(outbox) => outbox,
                Err(_) => {
                    report.offline += 1;
                    continue;
                }
            };

            match outbox.try_deliver(Arc::clone(&delivery)) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => match self.config.overflow_policy {
                    OverflowPolicy::DropNewest => {
                        warn!(
                            "Queue full for user {}, dropping message {}",
                            user_id, message_id
                        );
                        report.dropped += 1;
                    }
                    OverflowPolicy::Disconnect => {
                        warn!(
                            "Queue full for user {}, disconnecting slow consumer {}",
                            user_id,
                            outbox.connection_id().as_str()
                        );
                        let _ = self
                            .registry
                            .remove_connection(user_id, outbox.connection_id());
                        outbox.evict();
                        report.evicted += 1;
                    }
                },
                Err(TrySendError::Closed(_)) => {
                    debug!("Session for user {} closed during fan-out", user_id);
                    report.offline += 1;
                }
            }
        }

        self.recent.insert(message_id);
        Outcome::FannedOut(report)
    }
}
