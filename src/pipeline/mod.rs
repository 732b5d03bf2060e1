pub mod bootstrap;
pub mod camera;
pub mod detection_loop;
pub mod detector;
pub mod rgba_converter;

// Re-exports for convenience
pub use bootstrap::{BootstrapEvent, BootstrapMessage, Bootstrapped};
pub use camera::CameraStream;
pub use detection_loop::{DetectionLoop, OverlayFrame, TickRequest, TickSettings};
