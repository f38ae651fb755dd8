//! In-process domain event fan-out over a tokio broadcast channel.
//!
//! Publishing never blocks and never fails: with no live subscribers the
//! event is simply dropped.

use tokio::sync::broadcast;
use uuid::Uuid;

use civicsignal_common::IssueStatus;

use crate::issue::EngagementKind;
use crate::notification::DeliveryStatus;

const CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub enum DomainEvent {
    IssueCreated {
        issue_id: Uuid,
        reporter: Uuid,
    },
    IssueStatusChanged {
        issue_id: Uuid,
        old_status: IssueStatus,
        new_status: IssueStatus,
    },
    IssueAssigned {
        issue_id: Uuid,
        assignee: Uuid,
    },
    EngagementRecorded {
        issue_id: Uuid,
        kind: EngagementKind,
    },
    FeedbackSubmitted {
        issue_id: Uuid,
        rating: u8,
    },
    NotificationDispatched {
        notification_id: Uuid,
        status: DeliveryStatus,
    },
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn publish(&self, event: DomainEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_each_receive_every_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        let issue_id = Uuid::new_v4();
        bus.publish(DomainEvent::EngagementRecorded { issue_id, kind: EngagementKind::Views });

        for rx in [&mut a, &mut b] {
            match rx.recv().await.unwrap() {
                DomainEvent::EngagementRecorded { issue_id: got, .. } => {
                    assert_eq!(got, issue_id)
                }
                other => panic!("unexpected event: {other:?}"),
            }
        }
    }

    #[test]
    fn publish_without_subscribers_is_fine() {
        let bus = EventBus::new();
        bus.publish(DomainEvent::IssueCreated {
            issue_id: Uuid::new_v4(),
            reporter: Uuid::new_v4(),
        });
    }
}
