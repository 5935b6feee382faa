use parking_lot::Mutex;
use std::future::Future;
use tokio::sync::watch;

/// Coalesces concurrent executions of the same piece of async work.
///
/// The first caller runs the work; callers arriving while it is in flight wait
/// for and receive a clone of its result. The marker is cleared once the work
/// finishes (successfully or not), so the next call starts a fresh run. If the
/// running caller is dropped mid-flight, a waiting caller takes over.
pub struct SingleFlight<T> {
    slot: Mutex<Option<watch::Receiver<Option<T>>>>,
}

impl<T> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Clone> SingleFlight<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn in_flight(&self) -> bool {
        self.slot.lock().is_some()
    }

    pub async fn run<F, Fut>(&self, work: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let sender = loop {
            let mut receiver = {
                let mut slot = self.slot.lock();
                match slot.as_ref() {
                    Some(receiver) => receiver.clone(),
                    None => {
                        let (sender, receiver) = watch::channel(None);
                        *slot = Some(receiver);
                        break sender;
                    }
                }
            };
            if let Ok(outcome) = receiver.wait_for(Option::is_some).await {
                if let Some(value) = Option::clone(&outcome) {
                    return value;
                }
            }
        };

        let clear = ClearOnDrop(&self.slot);
        let value = work().await;
        sender.send_replace(Some(value.clone()));
        drop(clear);
        value
    }
}

struct ClearOnDrop<'a, T>(&'a Mutex<Option<watch::Receiver<Option<T>>>>);

impl<T> Drop for ClearOnDrop<'_, T> {
    fn drop(&mut self) {
        self.0.lock().take();
    }
}
