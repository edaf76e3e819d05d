//! libavdevice function declarations
//!
//! Capture devices (v4l2, avfoundation, dshow) register as input formats.

unsafe extern "C" {
  /// Register all input and output devices
  pub fn avdevice_register_all();
}

/// Register devices once per process
pub fn register_devices() {
  static ONCE: std::sync::Once = std::sync::Once::new();
  ONCE.call_once(|| unsafe { avdevice_register_all() });
}
