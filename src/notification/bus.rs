use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::watch;
use tokio::sync::OwnedSemaphorePermit;
use tokio::sync::Semaphore;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::MessageSender;
use super::ReleaseMessage;
use super::ReleaseMessageListener;
use crate::NotificationError;
use crate::Result;

struct Envelope {
    channel: String,
    message: ReleaseMessage,
}

/// Sending half of the in-process release topic.
///
/// Sending never waits: a full or closed queue drops the message and reports
/// [`NotificationError::Dropped`]. The periodic scan covers anything lost.
#[derive(Clone)]
pub struct ReleaseMessageBus {
    sender: mpsc::Sender<Envelope>,
    next_id: Arc<AtomicU64>,
}

/// Fans release messages out to the registered listeners.
///
/// Runs as one long-lived task. Each delivered message is handed to every
/// listener on one blocking task, since listeners read the rule store. At most
/// `max_in_flight` messages are handled at once; while all slots are busy the
/// dispatcher stops receiving, so backlog stays in the bounded queue.
pub struct ReleaseMessageDispatcher {
    receiver: mpsc::Receiver<Envelope>,
    listeners: Arc<Vec<Arc<dyn ReleaseMessageListener>>>,
    in_flight: Arc<Semaphore>,
    shutdown: watch::Receiver<()>,
}

impl ReleaseMessageDispatcher {
    /// Returns (dispatcher, bus) pair
    pub fn new(
        capacity: usize,
        max_in_flight: usize,
        shutdown: watch::Receiver<()>,
    ) -> (Self, ReleaseMessageBus) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));

        let dispatcher = Self {
            receiver,
            listeners: Arc::new(Vec::new()),
            in_flight: Arc::new(Semaphore::new(max_in_flight.max(1))),
            shutdown,
        };
        let bus = ReleaseMessageBus {
            sender,
            next_id: Arc::new(AtomicU64::new(0)),
        };

        (dispatcher, bus)
    }

    pub fn add_listener(
        &mut self,
        listener: Arc<dyn ReleaseMessageListener>,
    ) {
        Arc::make_mut(&mut self.listeners).push(listener);
    }

    /// Main loop; returns on shutdown or once every bus handle is dropped.
    pub async fn run(mut self) {
        info!("Release message dispatcher started");

        loop {
            let permit = tokio::select! {
                permit = self.in_flight.clone().acquire_owned() => {
                    match permit {
                        Ok(permit) => permit,
                        Err(_) => break,
                    }
                }

                _ = self.shutdown.changed() => {
                    info!("Release message dispatcher shutting down");
                    break;
                }
            };

            tokio::select! {
                maybe = self.receiver.recv() => {
                    match maybe {
                        Some(envelope) => self.dispatch(envelope, permit),
                        None => {
                            info!("All release message senders dropped");
                            break;
                        }
                    }
                }

                _ = self.shutdown.changed() => {
                    info!("Release message dispatcher shutting down");
                    break;
                }
            }
        }

        info!("Release message dispatcher stopped");
    }

    fn dispatch(
        &self,
        envelope: Envelope,
        permit: OwnedSemaphorePermit,
    ) {
        debug!(
            id = envelope.message.id,
            channel = %envelope.channel,
            "dispatching release message"
        );

        let listeners = self.listeners.clone();
        tokio::task::spawn_blocking(move || {
            for listener in listeners.iter() {
                listener.handle_message(&envelope.message, &envelope.channel);
            }
            drop(permit);
        });
    }
}

impl MessageSender for ReleaseMessageBus {
    fn send_message(
        &self,
        message: &str,
        channel: &str,
    ) -> Result<()> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let envelope = Envelope {
            channel: channel.to_string(),
            message: ReleaseMessage::new(id, message),
        };

        match self.sender.try_send(envelope) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(envelope)) => {
                warn!("release message queue full, dropping {:?}", envelope.message.message);
                Err(NotificationError::Dropped(envelope.message.message).into())
            }
            Err(TrySendError::Closed(envelope)) => {
                warn!("release message bus closed, dropping {:?}", envelope.message.message);
                Err(NotificationError::Dropped(envelope.message.message).into())
            }
        }
    }
}
