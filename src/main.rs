mod blackboard; // shared readbacks and faults
mod bus; // broadcast topics
mod control; // single-owner control thread
mod settings; // config/default.toml loading
mod sim; // simulated module hardware
mod telemetry; // telemetry sink over the bus

use std::{
    f64::consts::PI,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

use anyhow::Context;
use swerve_kinematics::{ModuleState, normalize_angle};
use swerve_module::SwerveModule;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use blackboard::{Blackboard, clear_fault, raise_fault, snapshot};
use bus::Topic;
use control::{Command, ControlLoop};
use settings::ControlConfig;
use sim::SimPlant;
use telemetry::{Sample, TopicTelemetry};

const FAULT_CMD_TIMEOUT: &str = "command timeout";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Swerve module runner started.");
    let config = settings::load_config().context("failed to load configuration")?;

    // Simulated wheel resting at an arbitrary heading, with a slowly drifting steering encoder.
    let plant = SimPlant::new(config.module.magnet_offset_degrees, 2.4, 0.01);

    let commands: Topic<Command> = Topic::new("commands", 16);
    let samples: Topic<Sample> = Topic::new("telemetry", 64);

    let module = SwerveModule::new(
        config.module.clone(),
        plant.drive.clone(),
        plant.steering.clone(),
        plant.absolute.clone(),
        Arc::new(TopicTelemetry::new(samples.clone())),
    )
    .context("failed to initialize swerve module")?;

    let bb: Blackboard = Arc::default();
    let shutdown = Arc::new(AtomicBool::new(false));

    info!("Spawning control thread...");
    let stepper = plant.clone();
    let control_thread = ControlLoop::new(
        module,
        move |dt| stepper.step(dt),
        Arc::clone(&bb),
        commands.subscribe(),
        config.control.clone(),
    )
    .spawn(Arc::clone(&shutdown))?;

    let max_speed = config.module.max_speed_mps;
    tokio::select! {
        res = async {
            tokio::try_join!(
                drive_pattern(commands.clone(), max_speed),
                watchdog(bb.clone(), config.control.clone()),
                telemetry_logger(bb.clone(), samples.subscribe(), plant.clone()),
                resync(commands.clone(), config.control.clone()),
            )
        } => {
            res?;
        }
        res = tokio::signal::ctrl_c() => {
            res.context("failed to listen for ctrl-c")?;
            info!("Ctrl-C received, shutting down.");
        }
    }

    shutdown.store(true, Ordering::Relaxed);
    tokio::task::spawn_blocking(move || control_thread.join())
        .await?
        .map_err(|_| anyhow::anyhow!("control thread panicked"))?;
    info!("Swerve module runner stopped.");
    Ok(())
}

/// 20 Hz demo driver: sweeps the heading around the circle at half speed.
async fn drive_pattern(commands: Topic<Command>, max_speed: f64) -> anyhow::Result<()> {
    info!("Drive pattern task started.");
    commands.publish(Command::ResetEncoders);
    let mut ticker = tokio::time::interval(Duration::from_millis(50));
    let started = Instant::now();
    loop {
        ticker.tick().await;
        let t = started.elapsed().as_secs_f64();
        // A full revolution every 8 s, with a step reversal every 10 s to exercise the optimizer.
        let reversal = if (t / 10.0) as u64 % 2 == 1 { PI } else { 0.0 };
        let heading = normalize_angle(t * PI / 4.0 + reversal);
        let desired = ModuleState::new(0.5 * max_speed, heading);
        debug!(%desired, "Publishing drive command");
        commands.publish(Command::Drive(desired));
    }
}

async fn watchdog(bb: Blackboard, control: ControlConfig) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let timeout = Duration::from_millis(control.watchdog_timeout_ms);
    let mut tick = tokio::time::interval(Duration::from_millis(25));
    let mut timed_out = false;
    loop {
        tick.tick().await;
        let last_cmd_ts = snapshot(&bb).last_cmd_ts;
        let age = Instant::now() - last_cmd_ts;
        if age > timeout {
            if !timed_out {
                warn!(?age, "Drive command timeout! Wheel held at zero speed.");
            }
            timed_out = true;
            raise_fault(&bb, FAULT_CMD_TIMEOUT);
        } else if timed_out {
            info!("Drive commands resumed.");
            timed_out = false;
            clear_fault(&bb, FAULT_CMD_TIMEOUT);
        }
    }
}

async fn telemetry_logger(
    bb: Blackboard,
    mut samples: tokio::sync::broadcast::Receiver<Arc<Sample>>,
    plant: SimPlant,
) -> anyhow::Result<()> {
    info!("Telemetry logger started.");
    let mut report = tokio::time::interval(Duration::from_secs(1));
    loop {
        tokio::select! {
            _ = report.tick() => {
                let state = snapshot(&bb);
                info!(
                    speed = state.module_state.speed,
                    angle = state.module_state.angle,
                    distance = state.module_position.distance,
                    reference = ?state.reference,
                    since_sync = ?state.last_sync_ts.map(|t| t.elapsed()),
                    true_heading = plant.true_heading(),
                    faults = ?state.faults,
                    "Module status"
                );
            }
            sample = samples.recv() => match sample {
                Ok(sample) => debug!(
                    channel = %sample.channel,
                    value = sample.value,
                    age = ?sample.at.elapsed(),
                    "Telemetry"
                ),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Telemetry logger lagged.");
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// Asks the control thread to resync the steering encoder on a fixed period, if configured.
async fn resync(commands: Topic<Command>, control: ControlConfig) -> anyhow::Result<()> {
    let Some(period_s) = control.resync_period_s.filter(|p| *p > 0) else {
        return Ok(());
    };
    info!(period_s, "Resync task started.");
    let mut tick = tokio::time::interval(Duration::from_secs(period_s));
    tick.tick().await;
    loop {
        tick.tick().await;
        commands.publish(Command::Synchronize);
    }
}
