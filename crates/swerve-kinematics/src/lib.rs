#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library for single swerve module steering math."]
#![doc = ""]
#![doc = "This crate provides the module state types, the angle folding and unwrapping used to"]
#![doc = "feed a continuous steering position controller, and reverse-drive state optimization."]

pub mod angle;
pub mod state;

pub use angle::{fold_angle, normalize_angle, shortest_delta, unwrap_reference};
pub use state::{ModulePosition, ModuleState};
