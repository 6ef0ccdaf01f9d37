//! A plugin that records every event it is handed.

use parking_lot::Mutex;
use slirc_bot::events::{Event, EventKind};
use slirc_bot::plugins::{Declaration, Plugin};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone, Default)]
pub struct Recorder {
    events: Arc<Mutex<Vec<Event>>>,
}

impl Plugin for Recorder {
    fn declare(&self, plugin: &mut Declaration) -> anyhow::Result<()> {
        plugin.name("recorder").author("tests");
        for kind in EventKind::ALL {
            let events = self.events.clone();
            plugin.on(kind, move |event| {
                events.lock().push(event.clone());
                Ok(())
            });
        }
        Ok(())
    }
}

impl Recorder {
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().clone()
    }

    pub fn count(&self, kind: EventKind) -> usize {
        self.events.lock().iter().filter(|e| e.kind() == kind).count()
    }

    /// Poll until `predicate` holds for the recorded events.
    pub async fn wait_for<F>(&self, predicate: F) -> Vec<Event>
    where
        F: Fn(&[Event]) -> bool,
    {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            {
                let events = self.events.lock();
                if predicate(&events) {
                    return events.clone();
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out; recorded: {:?}",
                self.events.lock().iter().map(Event::kind).collect::<Vec<_>>()
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Wait until at least `n` events of `kind` were recorded.
    pub async fn wait_for_kind(&self, kind: EventKind, n: usize) -> Vec<Event> {
        self.wait_for(|events| events.iter().filter(|e| e.kind() == kind).count() >= n)
            .await
    }
}
