use std::collections::HashMap;
use std::future::Future;
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::action::{ActionKind, DeviceAction, DeviceKind};
use crate::channel::AsyncActionSink;
use crate::error::DriverError;
use crate::sink::ActionSink;


/// Lowest position a servo can reach, in degrees
pub const SERVO_MIN: f64 = 0.0;
/// Highest position a servo can reach, in degrees
pub const SERVO_MAX: f64 = 180.0;
/// Lowest LED brightness, in percent
pub const LED_MIN: f64 = 0.0;
/// Highest LED brightness, in percent
pub const LED_MAX: f64 = 100.0;
/// Number of state changes kept in the history, oldest dropped first
pub const HISTORY_LIMIT: usize = 4096;


/// Settings for the simulated driver.
#[derive(Clone, Debug, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct SimulatorSettings {
    /// Actually wait out the duration of timed actions
    pub realtime: bool,
    /// Probability in [0, 1] that any given action is rejected
    pub failure_rate: f64,
    /// Seed for the failure injection, random when absent
    pub seed: Option<u64>,
}


/// A state change the simulator actually carried out.
#[derive(Clone, Debug, PartialEq)]
pub struct StateChange {
    /// The leaf device
    pub device: String,
    /// The value the device ended up at
    pub value: f64,
}

/// What a single action turns into once clamped against the current state.
struct Plan {
    target: f64,
    restore: Option<f64>,
    hold: Duration,
}


/// A driver keeping device state in memory instead of driving hardware.
///
/// Every device starts at zero until it is first driven. A simulated clock advances by
/// the duration of every timed action and every pause, whether or not the simulator
/// waits in real time.
/// Servo positions are clamped to [`SERVO_MIN`, `SERVO_MAX`] and LED brightness to
/// [`LED_MIN`, `LED_MAX`]. A relative move with a duration is temporary: the device is held
/// at the new value for the duration and then restored. An absolute set with a duration is
/// held for the duration and kept.
pub struct SimulatedDriver {
    settings: SimulatorSettings,
    state: HashMap<String, f64>,
    history: Vec<StateChange>,
    elapsed: Duration,
    rng: StdRng,
}

impl SimulatedDriver {
    /// Create a simulator with default settings: no waiting, no injected faults
    pub fn new() -> SimulatedDriver {
        SimulatedDriver::with_settings(SimulatorSettings::default())
    }

    /// Create a simulator from explicit settings.
    ///
    /// The failure rate is clamped into [0, 1].
    pub fn with_settings(mut settings: SimulatorSettings) -> SimulatedDriver {
        settings.failure_rate = if settings.failure_rate.is_nan() {
            0.0
        } else {
            settings.failure_rate.clamp(0.0, 1.0)
        };
        let rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        SimulatedDriver { settings, state: HashMap::new(), history: vec![], elapsed: Duration::ZERO, rng }
    }

    /// The current value of a device, if it has ever been driven
    pub fn value(&self, device: &str) -> Option<f64> {
        self.state.get(device).copied()
    }

    /// The most recent state changes, including restores after temporary moves.
    ///
    /// At most [`HISTORY_LIMIT`] changes are kept.
    pub fn history(&self) -> &[StateChange] {
        &self.history
    }

    /// Simulated time spent in timed actions and pauses
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Advance the simulated clock, returning how long to really sleep
    fn pass_time(&mut self, duration: Duration) -> Option<Duration> {
        self.elapsed = self.elapsed.saturating_add(duration);
        if self.settings.realtime && !duration.is_zero() {
            Some(duration)
        } else {
            None
        }
    }

    /// Work out the target value for an action and decide whether it should be rejected.
    fn plan(&mut self, action: &DeviceAction) -> Result<Plan, DriverError> {
        if self.settings.failure_rate > 0.0 && self.rng.gen_bool(self.settings.failure_rate) {
            warn!(device = %action.device, "injected driver fault");
            return Err(DriverError::Rejected {
                device: action.device.clone(),
                reason: "injected fault".to_string(),
            });
        }
        let current = self.value(&action.device).unwrap_or(0.0);
        let requested = match action.kind {
            ActionKind::RelativeMove => current + action.amount,
            ActionKind::AbsoluteSet => action.amount,
        };
        let target = clamp_for(action.device_kind, &action.device, requested);
        let restore = match action.kind {
            ActionKind::RelativeMove if action.is_timed() => Some(current),
            _ => None,
        };
        Ok(Plan { target, restore, hold: action.duration })
    }

    fn record(&mut self, device: &str, value: f64) {
        debug!(device, value, "device state changed");
        self.state.insert(device.to_string(), value);
        if self.history.len() >= HISTORY_LIMIT {
            self.history.drain(..HISTORY_LIMIT / 2);
        }
        self.history.push(StateChange { device: device.to_string(), value });
    }
}

impl Default for SimulatedDriver {
    fn default() -> Self {
        SimulatedDriver::new()
    }
}

/// Clamp a requested value into the range the device supports.
fn clamp_for(kind: DeviceKind, device: &str, requested: f64) -> f64 {
    let (min, max) = match kind {
        DeviceKind::Servo => (SERVO_MIN, SERVO_MAX),
        DeviceKind::Led => (LED_MIN, LED_MAX),
    };
    let clamped = requested.clamp(min, max);
    if clamped != requested {
        warn!(device, requested, clamped, "{} value out of range", kind);
    }
    clamped
}

impl ActionSink for SimulatedDriver {
    fn apply_action(&mut self, action: &DeviceAction) -> Result<(), DriverError> {
        let plan = self.plan(action)?;
        self.record(&action.device, plan.target);
        if let Some(hold) = self.pass_time(plan.hold) {
            thread::sleep(hold);
        }
        if let Some(previous) = plan.restore {
            self.record(&action.device, previous);
        }
        Ok(())
    }

    fn read_state(&mut self, device: &str) -> Result<Option<f64>, DriverError> {
        Ok(Some(self.value(device).unwrap_or(0.0)))
    }

    fn wait(&mut self, duration: Duration) -> Result<(), DriverError> {
        if let Some(pause) = self.pass_time(duration) {
            thread::sleep(pause);
        }
        Ok(())
    }
}

impl AsyncActionSink for SimulatedDriver {
    fn apply_action(&mut self, action: DeviceAction) -> impl Future<Output = Result<(), DriverError>> + Send {
        async move {
            let plan = self.plan(&action)?;
            self.record(&action.device, plan.target);
            if let Some(hold) = self.pass_time(plan.hold) {
                tokio::time::sleep(hold).await;
            }
            if let Some(previous) = plan.restore {
                self.record(&action.device, previous);
            }
            Ok(())
        }
    }

    fn read_state(&mut self, device: String) -> impl Future<Output = Result<Option<f64>, DriverError>> + Send {
        let value = self.value(&device).unwrap_or(0.0);
        async move { Ok(Some(value)) }
    }

    fn wait(&mut self, duration: Duration) -> impl Future<Output = Result<(), DriverError>> + Send {
        let pause = self.pass_time(duration);
        async move {
            if let Some(pause) = pause {
                tokio::time::sleep(pause).await;
            }
            Ok(())
        }
    }
}
