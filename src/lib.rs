//! A simulator for logic circuits described in a small definition language.
//!
//! A definition file declares devices (gates, flip-flops, switches, clocks,
//! RC pulse generators and signal generators), the connections between their ports,
//! and the outputs to monitor. [`Scanner`] and [`Parser`] turn the file into a [`Circuit`],
//! which can then be stepped one cycle at a time.

mod names;
mod loc;
mod error;
mod scanner;
mod parse;
mod devices;
mod network;
mod monitors;
mod circuit;
pub mod wavedump;


pub use names::*;
pub use loc::*;
pub use error::*;
pub use scanner::*;
pub use parse::*;
pub use devices::*;
pub use network::*;
pub use monitors::*;
pub use circuit::*;
