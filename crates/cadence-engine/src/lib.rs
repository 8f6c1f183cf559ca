//! Cadence engine crate.
//!
//! A frame renderer that drives a GPU device with a bounded number of frames
//! in flight, plus the winit shell that feeds it resize and tick events.

pub mod coords;
pub mod device;
pub mod frame;
pub mod renderer;
pub mod view;
pub mod window;

pub mod logging;
pub mod time;
