//! rollcall-hw — Webcam capture for the live attendance loop.
//!
//! Provides V4L2-based camera access producing RGB frames, with device
//! probing for machines where the first video node is not a capture
//! device.

pub mod camera;
pub mod frame;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use frame::{Frame, FrameError};
