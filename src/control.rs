use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread::JoinHandle,
    time::{Duration, Instant},
};

use spin_sleep::SpinSleeper;
use swerve_kinematics::ModuleState;
use swerve_module::{ModuleError, SwerveModule};
use swerve_motor::{AbsoluteEncoder, DriveMotor, SteeringMotor};
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, info, warn};

use crate::blackboard::{Blackboard, clear_fault, raise_fault, touch_cmd};
use crate::settings::ControlConfig;

pub const FAULT_SENSOR: &str = "module sensor unavailable";
pub const FAULT_ACTUATOR: &str = "module actuator command failed";
pub const FAULT_SYNC: &str = "steering encoder resync failed";

/// Requests accepted by the control thread.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// New desired module state; held until replaced or stale.
    Drive(ModuleState),
    /// Re-seed the steering encoder from the absolute sensor.
    Synchronize,
    /// Zero the drive distance.
    ResetEncoders,
}

fn fault_for(err: &ModuleError) -> &'static str {
    match err {
        ModuleError::SensorUnavailable(_) => FAULT_SENSOR,
        ModuleError::Actuator(_) | ModuleError::Configuration { .. } => FAULT_ACTUATOR,
    }
}

/// Single owner of a [`SwerveModule`].
///
/// Commands are applied between cycles, so a resync can never land in the middle of a
/// drive command.
pub struct ControlLoop<D, S, A, P> {
    module: SwerveModule<D, S, A>,
    plant: P,
    bb: Blackboard,
    commands: broadcast::Receiver<Arc<Command>>,
    config: ControlConfig,
    desired: Option<ModuleState>,
    last_command: Instant,
    last_telemetry: Instant,
}

impl<D, S, A, P> ControlLoop<D, S, A, P>
where
    D: DriveMotor,
    S: SteeringMotor,
    A: AbsoluteEncoder,
    P: FnMut(f64),
{
    /// `plant` is called with the period in seconds after each command, to advance
    /// simulated hardware. Real hardware passes a no-op.
    pub fn new(
        module: SwerveModule<D, S, A>,
        plant: P,
        bb: Blackboard,
        commands: broadcast::Receiver<Arc<Command>>,
        config: ControlConfig,
    ) -> Self {
        let now = Instant::now();
        ControlLoop {
            module,
            plant,
            bb,
            commands,
            config,
            desired: None,
            last_command: now,
            last_telemetry: now,
        }
    }

    fn drain_commands(&mut self) {
        loop {
            match self.commands.try_recv() {
                Ok(command) => self.apply(&command),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Control thread lagged behind the command queue");
                }
                Err(TryRecvError::Closed) => break,
            }
        }
    }

    fn apply(&mut self, command: &Command) {
        match command {
            Command::Drive(state) => {
                self.desired = Some(*state);
                self.last_command = Instant::now();
                touch_cmd(&self.bb);
            }
            Command::Synchronize => match self.module.synchronize() {
                Ok(()) => {
                    clear_fault(&self.bb, FAULT_SYNC);
                    self.bb.write().last_sync_ts = Some(Instant::now());
                }
                Err(e) => {
                    warn!(error = %e, "Resync failed, keeping previous baseline");
                    raise_fault(&self.bb, FAULT_SYNC);
                }
            },
            Command::ResetEncoders => match self.module.reset_encoders() {
                Ok(()) => clear_fault(&self.bb, FAULT_ACTUATOR),
                Err(e) => {
                    warn!(error = %e, "Drive encoder reset failed");
                    raise_fault(&self.bb, fault_for(&e));
                }
            },
        }
    }

    /// State to command this cycle. A stale command keeps its heading but stops the wheel.
    fn current_setpoint(&self) -> Option<ModuleState> {
        let desired = self.desired?;
        let timeout = Duration::from_millis(self.config.watchdog_timeout_ms);
        if self.last_command.elapsed() > timeout {
            Some(ModuleState { speed: 0.0, ..desired })
        } else {
            Some(desired)
        }
    }

    /// Run one control cycle.
    pub fn cycle(&mut self) {
        self.drain_commands();

        if let Some(setpoint) = self.current_setpoint() {
            match self.module.set_desired_state(setpoint) {
                Ok(()) => clear_fault(&self.bb, FAULT_ACTUATOR),
                Err(e) => {
                    // skip the cycle, never command from a substituted reading
                    debug!(error = %e, "Skipping control cycle");
                    raise_fault(&self.bb, fault_for(&e));
                }
            }
        }

        let dt = Duration::from_millis(self.config.period_ms).as_secs_f64();
        (self.plant)(dt);

        match (self.module.state(), self.module.position()) {
            (Ok(state), Ok(position)) => {
                let mut g = self.bb.write();
                g.module_state = state;
                g.module_position = position;
                g.reference = self.module.reference();
                g.faults.retain(|f| f != FAULT_SENSOR);
            }
            (Err(e), _) | (_, Err(e)) => {
                debug!(error = %e, "Readback failed");
                raise_fault(&self.bb, FAULT_SENSOR);
            }
        }

        let telemetry_period = Duration::from_millis(self.config.telemetry_period_ms);
        if self.last_telemetry.elapsed() >= telemetry_period {
            self.last_telemetry = Instant::now();
            if let Err(e) = self.module.publish_telemetry() {
                debug!(error = %e, "Telemetry skipped");
            }
        }
    }
}

impl<D, S, A, P> ControlLoop<D, S, A, P>
where
    D: DriveMotor + Send + 'static,
    S: SteeringMotor + Send + 'static,
    A: AbsoluteEncoder + Send + 'static,
    P: FnMut(f64) + Send + 'static,
{
    /// Run the loop on a dedicated thread until `shutdown` is set.
    pub fn spawn(mut self, shutdown: Arc<AtomicBool>) -> std::io::Result<JoinHandle<()>> {
        std::thread::Builder::new()
            .name("control".into())
            .spawn(move || {
                info!(module = %self.module.config().name, period_ms = self.config.period_ms, "Control thread started.");
                let sleeper = SpinSleeper::new(1_000);
                let period = Duration::from_millis(self.config.period_ms);
                while !shutdown.load(Ordering::Relaxed) {
                    let started = Instant::now();
                    self.cycle();
                    if let Some(remaining) = period.checked_sub(started.elapsed()) {
                        sleeper.sleep(remaining);
                    }
                }
                info!("Control thread stopped.");
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blackboard::snapshot;
    use crate::bus::Topic;
    use crate::sim::SimPlant;
    use swerve_module::{ModuleConfig, NullTelemetry};
    use swerve_motor::{
        PidGains, RelativeEncoder, SimAbsoluteEncoder, SimDriveMotor, SimFault, SimSteeringMotor,
    };

    type SimLoop = ControlLoop<SimDriveMotor, SimSteeringMotor, SimAbsoluteEncoder, Box<dyn FnMut(f64)>>;

    fn module_config() -> ModuleConfig {
        ModuleConfig {
            name: "test".to_string(),
            drive_motor_id: 1,
            steering_motor_id: 2,
            absolute_encoder_id: 9,
            magnet_offset_degrees: 0.0,
            clockwise_positive: true,
            max_speed_mps: 4.0,
            nominal_voltage: 12.0,
            wheel_diameter_m: 0.1,
            drive_reduction: 0.15,
            steering_degrees_per_rotation: 16.8,
            steering_pid: PidGains::default(),
            absolute_encoder_period_ms: 100,
        }
    }

    fn setup(drift: f64, watchdog_timeout_ms: u64) -> (SimLoop, SimPlant, Topic<Command>, Blackboard) {
        let plant = SimPlant::new(0.0, 0.5, drift);
        let module = SwerveModule::new(
            module_config(),
            plant.drive.clone(),
            plant.steering.clone(),
            plant.absolute.clone(),
            Arc::new(NullTelemetry),
        )
        .unwrap();

        let bb: Blackboard = Arc::default();
        let commands = Topic::new("commands", 16);
        let config = ControlConfig {
            watchdog_timeout_ms,
            ..ControlConfig::default()
        };
        let stepper = plant.clone();
        let control = ControlLoop::new(
            module,
            Box::new(move |dt| stepper.step(dt)) as Box<dyn FnMut(f64)>,
            bb.clone(),
            commands.subscribe(),
            config,
        );
        (control, plant, commands, bb)
    }

    #[test]
    fn test_drive_command_reaches_module() {
        let (mut control, plant, commands, bb) = setup(0.0, 10_000);
        commands.publish(Command::Drive(ModuleState::new(2.0, 0.5)));
        for _ in 0..50 {
            control.cycle();
        }

        let state = snapshot(&bb);
        assert!((state.module_state.angle - 0.5).abs() < 1e-3);
        assert!(state.module_state.speed > 0.0);
        assert!(state.module_position.distance > 0.0);
        assert!((plant.drive.applied_voltage() - 6.0).abs() < 1e-9);
        assert!(state.faults.is_empty());
    }

    #[test]
    fn test_stale_command_stops_wheel() {
        let (mut control, plant, commands, _bb) = setup(0.0, 50);
        commands.publish(Command::Drive(ModuleState::new(2.0, 0.5)));
        control.cycle();
        assert!((plant.drive.applied_voltage() - 6.0).abs() < 1e-9);

        std::thread::sleep(Duration::from_millis(80));
        control.cycle();
        assert_eq!(plant.drive.applied_voltage(), 0.0);
        assert_eq!(plant.steering.reference(), Some(0.5));
    }

    #[test]
    fn test_synchronize_command_removes_drift() {
        let (mut control, plant, commands, bb) = setup(0.5, 10_000);
        commands.publish(Command::Drive(ModuleState::new(0.0, 0.5)));
        for _ in 0..50 {
            control.cycle();
        }
        // the encoder still reads the commanded heading, the wheel has drifted away from it
        assert!((plant.true_heading() - 0.5).abs() > 0.1);

        commands.publish(Command::Synchronize);
        control.cycle();
        let steering = plant.steering.position().unwrap();
        assert!((steering - plant.true_heading()).abs() < 0.05);
        assert!(snapshot(&bb).last_sync_ts.is_some());
    }

    #[test]
    fn test_sensor_failure_raises_fault() {
        let (mut control, plant, commands, bb) = setup(0.0, 10_000);
        commands.publish(Command::Drive(ModuleState::new(1.0, 0.0)));
        plant.steering.set_available(false);
        control.cycle();
        assert!(snapshot(&bb).faults.contains(&FAULT_SENSOR.to_string()));

        plant.steering.set_available(true);
        control.cycle();
        assert!(snapshot(&bb).faults.is_empty());
    }

    #[test]
    fn test_actuator_fault_clears_after_recovery() {
        let (mut control, plant, commands, bb) = setup(0.0, 10_000);
        commands.publish(Command::Drive(ModuleState::new(1.0, 0.0)));
        plant.drive.set_available(false);
        control.cycle();
        let faults = snapshot(&bb).faults;
        assert!(faults.contains(&FAULT_ACTUATOR.to_string()));
        assert!(faults.contains(&FAULT_SENSOR.to_string()));

        plant.drive.set_available(true);
        for _ in 0..20 {
            control.cycle();
        }
        assert!(snapshot(&bb).faults.is_empty());
        assert!((plant.drive.applied_voltage() - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_stale_reading_skips_cycle() {
        let (mut control, plant, commands, bb) = setup(0.0, 10_000);
        commands.publish(Command::Drive(ModuleState::new(1.0, 0.0)));
        plant.steering.set_fault(SimFault::Timeout { timeout_ms: 20 });
        control.cycle();

        assert_eq!(plant.drive.applied_voltage(), 0.0);
        assert_eq!(snapshot(&bb).faults, vec![FAULT_SENSOR.to_string()]);
    }

    #[test]
    fn test_failed_resync_is_reported() {
        let (mut control, plant, commands, bb) = setup(0.0, 10_000);
        plant.absolute.set_available(false);
        commands.publish(Command::Synchronize);
        control.cycle();
        assert!(snapshot(&bb).faults.contains(&FAULT_SYNC.to_string()));
    }

    #[test]
    fn test_reset_encoders_command() {
        let (mut control, _plant, commands, bb) = setup(0.0, 10_000);
        commands.publish(Command::Drive(ModuleState::new(2.0, 0.5)));
        for _ in 0..10 {
            control.cycle();
        }
        assert!(snapshot(&bb).module_position.distance > 0.0);

        commands.publish(Command::Drive(ModuleState::new(0.0, 0.5)));
        control.cycle();
        commands.publish(Command::ResetEncoders);
        control.cycle();
        assert!(snapshot(&bb).module_position.distance.abs() < 1e-9);
    }
}
