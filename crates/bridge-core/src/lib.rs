#![doc = "Event-to-interpreter bridging layer for a single-threaded Forth VM."]

pub mod bridge;
pub mod host;
pub mod interpreter;
pub mod isr;
pub mod queue;
pub mod sample;
pub mod sensor;

pub use bridge::*;
pub use host::HostAdapter;
pub use interpreter::*;
pub use isr::*;
pub use queue::*;
pub use sample::*;
pub use sensor::*;
