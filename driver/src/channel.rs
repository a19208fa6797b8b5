use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc::{self, Receiver, Sender};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::action::DeviceAction;
use crate::error::DriverError;
use crate::sink::ActionSink;


const CHANNEL_QUEUE_SIZE: usize = 128;


type ApplyReply = oneshot::Sender<Result<(), DriverError>>;
type ReadReply = oneshot::Sender<Result<Option<f64>, DriverError>>;
type DriverSender = Sender<DriverRequest>;
type DriverReceiver = Receiver<DriverRequest>;


/// A request travelling from a [`ChannelSink`] to the driver task
pub enum DriverRequest {
    /// Apply an action and report the outcome
    Apply(DeviceAction, ApplyReply),
    /// Read back the state of a device
    Read(String, ReadReply),
    /// Pause, replying once the pause is over
    Wait(Duration, ApplyReply),
}


/// The asynchronous counterpart of [`ActionSink`].
///
/// A driver that needs to await (timers, serial ports, network links) implements this and
/// runs on a tokio task via [`spawn_driver_task`]. Suspension happens entirely here.
pub trait AsyncActionSink {
    /// Apply a single action to a leaf device.
    fn apply_action(&mut self, action: DeviceAction) -> impl Future<Output = Result<(), DriverError>> + Send;

    /// Report the current value of a leaf device, if the driver knows it.
    fn read_state(&mut self, _device: String) -> impl Future<Output = Result<Option<f64>, DriverError>> + Send {
        async { Ok(None) }
    }

    /// Pause between actions without blocking the runtime.
    fn wait(&mut self, duration: Duration) -> impl Future<Output = Result<(), DriverError>> + Send {
        async move {
            tokio::time::sleep(duration).await;
            Ok(())
        }
    }
}


/// An [`ActionSink`] that forwards every action to an asynchronous driver task and waits
/// for the reply.
///
/// The waiting is blocking, so a `ChannelSink` must be used from a thread that is not
/// driving a tokio runtime (a plain thread or `spawn_blocking`).
#[derive(Clone)]
pub struct ChannelSink {
    sender: DriverSender,
}

impl ChannelSink {
    /// Create a sink and the receiving end a driver task should serve.
    pub fn new() -> (ChannelSink, DriverReceiver) {
        let (sender, receiver) = mpsc::channel(CHANNEL_QUEUE_SIZE);
        (ChannelSink { sender }, receiver)
    }

    /// Send a request and block until the driver task replies to it
    fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, DriverError>>) -> DriverRequest,
        what: &str,
    ) -> Result<T, DriverError> {
        let (reply_sender, reply_receiver) = oneshot::channel();
        if self.sender.blocking_send(build(reply_sender)).is_err() {
            warn!("Error sending {} to driver task.", what);
            return Err(DriverError::Disconnected);
        }
        match reply_receiver.blocking_recv() {
            Ok(result) => result,
            Err(_) => Err(DriverError::Disconnected),
        }
    }
}

impl ActionSink for ChannelSink {
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError> {
        let what = format!("action for {}", action.device);
        self.request(|reply| DriverRequest::Apply(action.clone(), reply), &what)
    }

    fn read_state(&mut self, device: &str) -> Result<Option<f64>, DriverError> {
        let what = format!("state read for {}", device);
        self.request(|reply| DriverRequest::Read(device.to_string(), reply), &what)
    }

    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.request(|reply| DriverRequest::Wait(duration, reply), "wait")
    }
}

/// Serve requests from a channel with an asynchronous driver until every sender is dropped.
///
/// The driver is handed back once the channel closes.
pub async fn serve_driver<D: AsyncActionSink>(mut driver: D, mut receiver: DriverReceiver) -> D {
    while let Some(request) = receiver.recv().await {
        let delivered = match request {
            DriverRequest::Apply(action, reply) => {
                debug!(action = %action, "driver task applying action");
                let result = driver.apply_action(action).await;
                reply.send(result).is_ok()
            },
            DriverRequest::Read(device, reply) => {
                let result = driver.read_state(device).await;
                reply.send(result).is_ok()
            },
            DriverRequest::Wait(duration, reply) => {
                debug!(?duration, "driver task waiting");
                let result = driver.wait(duration).await;
                reply.send(result).is_ok()
            },
        };
        if !delivered {
            warn!("Requester went away before the driver replied.");
        }
    }
    debug!("driver channel closed");
    driver
}

/// Spawn a driver on the current tokio runtime and return a sink connected to it.
pub fn spawn_driver_task<D>(driver: D) -> (ChannelSink, JoinHandle<D>)
where
    D: AsyncActionSink + Send + 'static,
{
    let (sink, receiver) = ChannelSink::new();
    let handle = tokio::spawn(serve_driver(driver, receiver));
    (sink, handle)
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::action::DeviceKind;
    use crate::simulated::SimulatedDriver;

    struct Refusing;

    impl AsyncActionSink for Refusing {
        fn apply_action(&mut self, action: DeviceAction) -> impl Future<Output = Result<(), DriverError>> + Send {
            async move {
                Err(DriverError::Rejected { device: action.device, reason: "refusing".to_string() })
            }
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_round_trip() {
        let (sink, handle) = spawn_driver_task(SimulatedDriver::new());
        tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let action = DeviceAction::relative_move("s1", DeviceKind::Servo, 25.0, Duration::ZERO);
            sink.apply_action(&action).unwrap();
            sink.apply_action(&action).unwrap();
        })
        .await
        .unwrap();
        let driver = handle.await.unwrap();
        assert_eq!(driver.value("s1"), Some(50.0));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_read_state() {
        let (sink, _handle) = spawn_driver_task(SimulatedDriver::new());
        let (refusing_sink, _refusing_handle) = spawn_driver_task(Refusing);
        let (value, unknown) = tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let mut refusing_sink = refusing_sink;
            let action = DeviceAction::absolute_set("l1", DeviceKind::Led, 35.0, Duration::ZERO);
            sink.apply_action(&action).unwrap();
            (sink.read_state("l1"), refusing_sink.read_state("l1"))
        })
        .await
        .unwrap();
        assert_eq!(value, Ok(Some(35.0)));
        assert_eq!(unknown, Ok(None));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_wait() {
        let (sink, handle) = spawn_driver_task(SimulatedDriver::new());
        let (refusing_sink, _refusing_handle) = spawn_driver_task(Refusing);
        let started = std::time::Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let mut refusing_sink = refusing_sink;
            sink.wait(Duration::from_secs(2)).unwrap();
            refusing_sink.wait(Duration::from_millis(10))
        })
        .await
        .unwrap();
        assert_eq!(result, Ok(()));
        assert!(started.elapsed() >= Duration::from_millis(10));
        let driver = handle.await.unwrap();
        assert_eq!(driver.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_driver_error_is_returned() {
        let (sink, _handle) = spawn_driver_task(Refusing);
        let result = tokio::task::spawn_blocking(move || {
            let mut sink = sink;
            let action = DeviceAction::absolute_set("l1", DeviceKind::Led, 1.0, Duration::ZERO);
            sink.apply_action(&action)
        })
        .await
        .unwrap();
        assert!(matches!(result, Err(DriverError::Rejected { .. })));
    }

    #[test]
    fn test_disconnected() {
        let (mut sink, receiver) = ChannelSink::new();
        drop(receiver);
        let action = DeviceAction::absolute_set("l1", DeviceKind::Led, 1.0, Duration::ZERO);
        assert_eq!(sink.apply_action(&action), Err(DriverError::Disconnected));
    }
}
