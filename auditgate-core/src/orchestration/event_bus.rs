use async_trait::async_trait;
use std::fmt;
use tokio::sync::broadcast;

use crate::error::Result;

use super::events::{JobEvent, JobEventPublisher};

/// In-process fan-out of job lifecycle events. Publishing never blocks and
/// never fails: with no subscribers the event is dropped, and slow
/// subscribers observe `RecvError::Lagged`.
pub struct InProcJobEventBus {
    sender: broadcast::Sender<JobEvent>,
    capacity: usize,
}

impl fmt::Debug for InProcJobEventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InProcJobEventBus")
            .field("capacity", &self.capacity)
            .field("subscribers", &self.sender.receiver_count())
            .finish()
    }
}

impl Default for InProcJobEventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

impl InProcJobEventBus {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (sender, _) = broadcast::channel(capacity);
        Self { sender, capacity }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl JobEventPublisher for InProcJobEventBus {
    async fn publish(&self, event: JobEvent) -> Result<()> {
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orchestration::events::JobEventPayload;
    use auditgate_model::JobId;

    #[tokio::test]
    async fn subscribers_receive_published_events() {
        let bus = InProcJobEventBus::new(8);
        let mut rx = bus.subscribe();
        let job_id = JobId::new();

        bus.publish(JobEvent::now(job_id, JobEventPayload::Started))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.job_id, job_id);
        assert_eq!(event.payload, JobEventPayload::Started);
    }

    #[tokio::test]
    async fn publishing_without_subscribers_is_fine() {
        let bus = InProcJobEventBus::default();
        bus.publish(JobEvent::now(JobId::new(), JobEventPayload::Started))
            .await
            .unwrap();
    }
}
