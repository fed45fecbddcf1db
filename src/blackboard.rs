use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use swerve_kinematics::{ModulePosition, ModuleState};

/// Latest readbacks of the module, written by the control thread and read by everyone else.
#[derive(Clone)]
pub struct State {
    pub module_state: ModuleState,
    pub module_position: ModulePosition,
    /// Unbounded steering setpoint of the last command.
    pub reference: Option<f64>,
    pub last_cmd_ts: Instant,
    pub last_sync_ts: Option<Instant>,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            module_state: ModuleState::default(),
            module_position: ModulePosition::default(),
            reference: None,
            last_cmd_ts: Instant::now(),
            last_sync_ts: None,
            faults: Vec::new(),
        }
    }
}

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

pub fn touch_cmd(bb: &Blackboard) {
    bb.write().last_cmd_ts = Instant::now();
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

pub fn clear_fault(bb: &Blackboard, msg: &str) {
    bb.write().faults.retain(|s| s != msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_are_deduplicated_and_cleared() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "cmd timeout");
        raise_fault(&bb, "cmd timeout");
        raise_fault(&bb, "sensor unavailable");
        assert_eq!(snapshot(&bb).faults.len(), 2);

        clear_fault(&bb, "cmd timeout");
        assert_eq!(snapshot(&bb).faults, vec!["sensor unavailable".to_string()]);
    }

    #[test]
    fn test_touch_cmd_advances_timestamp() {
        let bb: Blackboard = Arc::default();
        let before = snapshot(&bb).last_cmd_ts;
        touch_cmd(&bb);
        assert!(snapshot(&bb).last_cmd_ts >= before);
    }
}
