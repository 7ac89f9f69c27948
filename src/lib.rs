pub mod boundary;
pub mod checkpoint;
pub mod config;
pub mod context;
pub mod driver;
pub mod electrostatic;
pub mod error;
pub mod fdtd;
pub mod fields;
pub mod fvm;
pub mod grid;
pub mod kinetic;
pub mod moments;
pub mod reconstruct;
pub mod riemann;
pub mod simulation;
pub mod source;
pub mod timestep;

pub use error::{Error, Result};

/// Choose between f32 and f64 to change precision of floating point numbers.
pub type Float = f64;
