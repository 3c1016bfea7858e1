use std::sync::Arc;
use tokio::sync::broadcast;

use ballbot_kinematics::{EncoderSample, Pose};
use ballbot_motion::WheelPower;

/// Broadcast topic with bounded capacity.
/// `T` must be `Send + Sync` because the control thread publishes into async tasks.
#[derive(Debug, Clone)]
pub struct Topic<T> {
    tx: broadcast::Sender<Arc<T>>,
}

impl<T: Send + Sync + 'static> Topic<T> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Publishes to every current subscriber. Returns how many received it;
    /// publishing with no subscribers is not an error.
    pub fn publish(&self, msg: T) -> usize {
        self.tx.send(Arc::new(msg)).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<T>> {
        self.tx.subscribe()
    }
}

/// One control cycle as seen by observers.
#[derive(Debug, Clone)]
pub struct Telemetry {
    pub now_ms: f64,
    pub sample: EncoderSample,
    pub pose: Pose,
    pub power: WheelPower,
    pub goal: &'static str,
    pub complete: bool,
}
