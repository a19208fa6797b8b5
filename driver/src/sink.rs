use std::thread;
use std::time::Duration;

use crate::action::DeviceAction;
use crate::error::DriverError;


/// Functions needed to define a device driver.
///
/// This is the only way the interpreter touches the outside world. A call may block
/// for as long as the action takes, for example while a servo reaches its position.
/// Drivers that need to suspend should live behind a [`ChannelSink`](crate::ChannelSink)
/// instead of blocking the interpreter thread themselves.
pub trait ActionSink {
    /// Apply a single action to a leaf device.
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError>;

    /// Report the current value of a leaf device, if the driver knows it.
    ///
    /// Drivers that cannot observe their devices keep the default, which knows nothing.
    fn read_state(&mut self, _device: &str) -> Result<Option<f64>, DriverError> {
        Ok(None)
    }

    /// Pause between actions.
    ///
    /// The default blocks the calling thread for the whole duration.
    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        thread::sleep(duration);
        Ok(())
    }
}

impl<S: ActionSink + ?Sized> ActionSink for &mut S {
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError> {
        (**self).apply_action(action)
    }

    fn read_state(&mut self, device: &str) -> Result<Option<f64>, DriverError> {
        (**self).read_state(device)
    }

    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        (**self).wait(duration)
    }
}

impl<S: ActionSink + ?Sized> ActionSink for Box<S> {
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError> {
        (**self).apply_action(action)
    }

    fn read_state(&mut self, device: &str) -> Result<Option<f64>, DriverError> {
        (**self).read_state(device)
    }

    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        (**self).wait(duration)
    }
}


/// A sink that only records the actions and pauses it receives.
///
/// Handy for checking exactly what a script would have done. Nothing is ever dropped, so
/// a long-lived recorder should be drained with [`take`](RecordingSink::take).
#[derive(Debug, Default)]
pub struct RecordingSink {
    actions: Vec<DeviceAction>,
    waits: Vec<Duration>,
    fail_on: Option<String>,
}

impl RecordingSink {
    /// Create a new empty recorder
    pub fn new() -> RecordingSink {
        RecordingSink::default()
    }

    /// Create a recorder that rejects every action for the given device
    pub fn failing_on(device: &str) -> RecordingSink {
        RecordingSink { fail_on: Some(device.to_string()), ..RecordingSink::default() }
    }

    /// The actions received so far, in order
    pub fn actions(&self) -> &[DeviceAction] {
        &self.actions
    }

    /// The pauses received so far, in order
    pub fn waits(&self) -> &[Duration] {
        &self.waits
    }

    /// Take the recorded actions, leaving the recorder empty
    pub fn take(&mut self) -> Vec<DeviceAction> {
        self.waits.clear();
        std::mem::take(&mut self.actions)
    }
}

impl ActionSink for RecordingSink {
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError> {
        if self.fail_on.as_deref() == Some(action.device.as_str()) {
            return Err(DriverError::Rejected {
                device: action.device.clone(),
                reason: "configured to fail".to_string(),
            });
        }
        self.actions.push(action.clone());
        Ok(())
    }

    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        self.waits.push(duration);
        Ok(())
    }
}
