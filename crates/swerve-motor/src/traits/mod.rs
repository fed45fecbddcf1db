//! Interfaces implemented by swerve module hardware.

pub mod encoder;
pub mod motor;
