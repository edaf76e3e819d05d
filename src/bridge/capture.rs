//! Camera capture with a synchronous pull model.
//!
//! A [`CaptureDevice`] delivers frames on its own thread to a
//! [`FrameObserver`]. The observer only copies a frame when a
//! [`CaptureSession::next_frame`] call has armed a destination buffer;
//! every other frame is discarded as late.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::plane::{copy_plane, PixelBuffer, PixelFormat};
use super::rendezvous::{self, Caller, OutputSlot, Responder};
use crate::{Error, Result};

/// Frame geometry latched from the first accepted frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry {
    /// Sum of every plane's `bytes_per_row * height`
    pub bytes: usize,
    pub width: usize,
    pub height: usize,
}

impl Geometry {
    pub fn is_empty(&self) -> bool {
        self.bytes == 0 || self.width == 0 || self.height == 0
    }
}

/// One delivery from a capture device
#[derive(Debug, Clone)]
pub struct SampleBuffer<'a> {
    /// Number of samples the native buffer carries
    pub num_samples: usize,
    pub image: Option<PixelBuffer<'a>>,
}

/// A capture device that pushes frames to an observer from its own thread.
pub trait CaptureDevice: Send {
    /// Start delivering frames. The device owns the observer until `stop`.
    fn start(&mut self, observer: FrameObserver) -> Result<()>;

    /// Stop delivery and release the observer. Returns once no further
    /// `on_sample` call can happen.
    fn stop(&mut self);
}

/// Opens capture devices by name.
pub trait CaptureBackend {
    /// An empty name selects the platform default device.
    fn open(&self, device: &str) -> Result<Box<dyn CaptureDevice>>;
}

/// Diagnostic counters for a capture session
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    /// Frames copied into a caller buffer
    pub delivered: u64,
    /// Frames discarded because no pull was armed
    pub late: u64,
    /// Frames dropped for sample count, pixel format or geometry
    pub rejected: u64,
    /// Pulls that returned fewer bytes than the session geometry
    pub short: u64,
    /// Pulls refused because the caller buffer was too small
    pub undersized: u64,
}

#[derive(Debug, Default)]
struct CaptureCounters {
    delivered: AtomicU64,
    late: AtomicU64,
    rejected: AtomicU64,
    short: AtomicU64,
    undersized: AtomicU64,
}

impl CaptureCounters {
    fn snapshot(&self) -> CaptureStats {
        CaptureStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            late: self.late.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            short: self.short.load(Ordering::Relaxed),
            undersized: self.undersized.load(Ordering::Relaxed),
        }
    }
}

/// Answer sent back to a pulling caller
#[derive(Debug, Clone, Copy)]
struct Delivery {
    copied: usize,
    geometry: Geometry,
}

/// Receives frames on the device's delivery thread.
pub struct FrameObserver {
    responder: Responder<Delivery>,
    geometry: Geometry,
    counters: Arc<CaptureCounters>,
}

impl FrameObserver {
    fn new(responder: Responder<Delivery>, counters: Arc<CaptureCounters>) -> Self {
        Self {
            responder,
            geometry: Geometry::default(),
            counters,
        }
    }

    /// Handle one frame from the device.
    ///
    /// Never blocks. Without an armed pull the frame is discarded.
    pub fn on_sample(&mut self, sample: &SampleBuffer<'_>) {
        let Some(request) = self.responder.poll() else {
            self.counters.late.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target: "avbridge", "late frame discarded");
            return;
        };

        let copied = self.accept(sample, request.slot);

        self.responder.respond(Delivery {
            copied,
            geometry: self.geometry,
        });
    }

    /// Validate the frame, latch or check geometry, and copy it into `slot`.
    fn accept(&mut self, sample: &SampleBuffer<'_>, slot: Option<OutputSlot>) -> usize {
        if sample.num_samples != 1 {
            tracing::warn!(
                target: "avbridge",
                num_samples = sample.num_samples,
                "number of samples is not supported"
            );
            return self.reject();
        }

        let Some(image) = sample.image.as_ref() else {
            tracing::warn!(target: "avbridge", "sample carries no image");
            return self.reject();
        };

        if image.format != PixelFormat::Nv12 || image.planes.len() != 2 {
            tracing::warn!(
                target: "avbridge",
                format = ?image.format,
                planes = image.planes.len(),
                "pixel format or plane count is not supported"
            );
            return self.reject();
        }

        let geometry = Geometry {
            bytes: image.padded_size(),
            width: image.width,
            height: image.height,
        };

        if self.geometry.is_empty() {
            self.geometry = geometry;
        } else if self.geometry != geometry {
            tracing::warn!(
                target: "avbridge",
                bytes = geometry.bytes,
                expected_bytes = self.geometry.bytes,
                width = geometry.width,
                expected_width = self.geometry.width,
                height = geometry.height,
                expected_height = self.geometry.height,
                "frame geometry changed, dropping frame"
            );
            return self.reject();
        }

        let Some(mut slot) = slot else {
            return 0;
        };

        // SAFETY: the caller is blocked in `exchange` until we respond
        let out = unsafe { slot.as_mut_slice() };

        match copy_planes(image, out) {
            Ok(copied) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                copied
            }
            Err(e) => {
                tracing::warn!(target: "avbridge", error = %e, "failed to copy frame");
                self.reject()
            }
        }
    }

    fn reject(&self) -> usize {
        self.counters.rejected.fetch_add(1, Ordering::Relaxed);
        0
    }
}

/// Copy plane 0 whole, then plane 1 right after it at `bytes_per_row0 * height`.
///
/// Both planes keep their own stride, so each moves as one bulk copy.
fn copy_planes(image: &PixelBuffer<'_>, out: &mut [u8]) -> Result<usize> {
    let luma = &image.planes[0];
    let chroma = &image.planes[1];

    let luma_bytes = copy_plane(
        luma.data,
        luma.bytes_per_row,
        out,
        luma.bytes_per_row,
        luma.bytes_per_row,
        luma.height,
    )?;

    let offset = luma.bytes_per_row * image.height;
    let len = out.len();
    let tail = out.get_mut(offset..).ok_or(Error::BufferTooSmall {
        len,
        required: offset,
    })?;

    let chroma_bytes = copy_plane(
        chroma.data,
        chroma.bytes_per_row,
        tail,
        chroma.bytes_per_row,
        chroma.bytes_per_row,
        chroma.height,
    )?;

    Ok(luma_bytes + chroma_bytes)
}

/// A running capture session with fixed frame geometry.
pub struct CaptureSession {
    device: Box<dyn CaptureDevice>,
    caller: Caller<Delivery>,
    geometry: Geometry,
    counters: Arc<CaptureCounters>,
}

impl CaptureSession {
    /// Open `device`, start it, and wait for the first frame to learn the geometry.
    ///
    /// Fails when the device cannot be opened or started, or when no frame
    /// with nonzero geometry arrives.
    pub fn open(backend: &dyn CaptureBackend, device: &str) -> Result<Self> {
        let mut device = backend.open(device)?;
        let (caller, responder) = rendezvous::pair();
        let counters = Arc::new(CaptureCounters::default());

        device.start(FrameObserver::new(responder, counters.clone()))?;

        let delivery = match caller.exchange(None) {
            Ok(delivery) => delivery,
            Err(e) => {
                device.stop();
                return Err(e);
            }
        };

        if delivery.geometry.is_empty() {
            device.stop();
            return Err(Error::Device("no frame with usable geometry".into()));
        }

        tracing::debug!(
            target: "avbridge",
            bytes = delivery.geometry.bytes,
            width = delivery.geometry.width,
            height = delivery.geometry.height,
            "capture session started"
        );

        Ok(Self {
            device,
            caller,
            geometry: delivery.geometry,
            counters,
        })
    }

    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Block until the next frame has been copied into `out`.
    ///
    /// Returns the number of bytes copied, which is less than the session
    /// byte count when the frame was dropped. A buffer smaller than the
    /// session byte count is refused without arming or writing.
    pub fn next_frame(&mut self, out: &mut [u8]) -> Result<usize> {
        if out.len() < self.geometry.bytes {
            self.counters.undersized.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "avbridge",
                size = out.len(),
                bytes = self.geometry.bytes,
                "not enough buffer to copy"
            );
            return Err(Error::BufferTooSmall {
                len: out.len(),
                required: self.geometry.bytes,
            });
        }

        let delivery = self.caller.exchange(Some(OutputSlot::new(out)))?;

        if delivery.copied != self.geometry.bytes {
            self.counters.short.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                target: "avbridge",
                copied = delivery.copied,
                bytes = self.geometry.bytes,
                "not enough buffer copied"
            );
        }

        Ok(delivery.copied)
    }

    pub fn stats(&self) -> CaptureStats {
        self.counters.snapshot()
    }

    /// Stop the device and release the session.
    pub fn finish(self) {}
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.device.stop();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::bridge::plane::Plane;
    use std::sync::atomic::AtomicBool;
    use std::sync::Mutex;
    use std::thread::{self, JoinHandle};
    use std::time::Duration;

    /// What the scripted camera currently produces
    #[derive(Debug, Clone, Copy)]
    pub(crate) struct Script {
        pub width: usize,
        pub height: usize,
        pub stride: usize,
        pub format: PixelFormat,
        pub num_samples: usize,
    }

    impl Script {
        pub(crate) fn nv12(width: usize, height: usize, stride: usize) -> Self {
            Self {
                width,
                height,
                stride,
                format: PixelFormat::Nv12,
                num_samples: 1,
            }
        }

        pub(crate) fn bytes(&self) -> usize {
            self.stride * self.height + self.stride * (self.height / 2)
        }
    }

    /// A camera that emits frames from a thread until stopped.
    /// Luma bytes hold the frame number, chroma bytes hold its complement.
    pub(crate) struct ScriptedCamera {
        script: Arc<Mutex<Script>>,
        running: Arc<AtomicBool>,
        worker: Option<JoinHandle<()>>,
        pub stopped: Arc<AtomicBool>,
    }

    impl ScriptedCamera {
        pub(crate) fn new(script: Arc<Mutex<Script>>) -> Self {
            Self {
                script,
                running: Arc::new(AtomicBool::new(false)),
                worker: None,
                stopped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl CaptureDevice for ScriptedCamera {
        fn start(&mut self, mut observer: FrameObserver) -> Result<()> {
            self.running.store(true, Ordering::SeqCst);
            let running = self.running.clone();
            let script = self.script.clone();

            self.worker = Some(thread::spawn(move || {
                let mut frame = 0u8;
                while running.load(Ordering::SeqCst) {
                    let s = *script.lock().unwrap();
                    let luma = vec![frame; s.stride * s.height];
                    let chroma = vec![!frame; s.stride * (s.height / 2)];
                    let sample = SampleBuffer {
                        num_samples: s.num_samples,
                        image: Some(PixelBuffer {
                            format: s.format,
                            width: s.width,
                            height: s.height,
                            planes: vec![
                                Plane {
                                    data: &luma,
                                    bytes_per_row: s.stride,
                                    width: s.width,
                                    height: s.height,
                                },
                                Plane {
                                    data: &chroma,
                                    bytes_per_row: s.stride,
                                    width: s.width,
                                    height: s.height / 2,
                                },
                            ],
                        }),
                    };
                    observer.on_sample(&sample);
                    frame = frame.wrapping_add(1);
                    thread::sleep(Duration::from_millis(1));
                }
            }));
            Ok(())
        }

        fn stop(&mut self) {
            self.running.store(false, Ordering::SeqCst);
            if let Some(worker) = self.worker.take() {
                let _ = worker.join();
            }
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    pub(crate) struct ScriptedBackend {
        pub script: Arc<Mutex<Script>>,
        pub stopped: Arc<AtomicBool>,
    }

    impl ScriptedBackend {
        pub(crate) fn new(script: Script) -> Self {
            Self {
                script: Arc::new(Mutex::new(script)),
                stopped: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl CaptureBackend for ScriptedBackend {
        fn open(&self, device: &str) -> Result<Box<dyn CaptureDevice>> {
            if device == "missing" {
                return Err(Error::Device(format!("no such device: {}", device)));
            }
            let mut camera = ScriptedCamera::new(self.script.clone());
            camera.stopped = self.stopped.clone();
            Ok(Box::new(camera))
        }
    }

    #[test]
    fn test_open_latches_geometry() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let session = CaptureSession::open(&backend, "").unwrap();

        assert_eq!(
            session.geometry(),
            Geometry {
                bytes: 16 * 4 + 16 * 2,
                width: 8,
                height: 4,
            }
        );
    }

    #[test]
    fn test_open_missing_device() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        assert!(matches!(
            CaptureSession::open(&backend, "missing"),
            Err(Error::Device(_))
        ));
    }

    #[test]
    fn test_open_fails_on_unsupported_format() {
        let mut script = Script::nv12(8, 4, 16);
        script.format = PixelFormat::Other(0x42475241);
        let backend = ScriptedBackend::new(script);

        assert!(CaptureSession::open(&backend, "").is_err());
        assert!(backend.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_open_fails_on_multi_sample_buffer() {
        let mut script = Script::nv12(8, 4, 16);
        script.num_samples = 2;
        let backend = ScriptedBackend::new(script);

        assert!(CaptureSession::open(&backend, "").is_err());
    }

    #[test]
    fn test_consecutive_pulls_fill_identical_sizes() {
        let script = Script::nv12(8, 4, 16);
        let backend = ScriptedBackend::new(script);
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        for _ in 0..3 {
            let mut out = vec![0u8; bytes];
            assert_eq!(session.next_frame(&mut out).unwrap(), bytes);

            // Plane 1 starts right after plane 0 and holds the complement
            let luma = out[0];
            assert!(out[..16 * 4].iter().all(|b| *b == luma));
            assert!(out[16 * 4..].iter().all(|b| *b == !luma));
        }

        let stats = session.stats();
        assert_eq!(stats.delivered, 3);
        assert_eq!(stats.short, 0);
    }

    #[test]
    fn test_pull_returns_fresh_frames() {
        let backend = ScriptedBackend::new(Script::nv12(4, 2, 4));
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        let mut first = vec![0u8; bytes];
        let mut second = vec![0u8; bytes];
        session.next_frame(&mut first).unwrap();
        session.next_frame(&mut second).unwrap();

        assert_ne!(first[0], second[0]);
    }

    #[test]
    fn test_undersized_pull_does_not_arm_or_write() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        let mut out = vec![0xA5u8; bytes - 1];
        assert!(matches!(
            session.next_frame(&mut out),
            Err(Error::BufferTooSmall { .. })
        ));
        assert!(out.iter().all(|b| *b == 0xA5));
        assert_eq!(session.stats().undersized, 1);
        assert_eq!(session.stats().delivered, 0);
    }

    #[test]
    fn test_larger_buffer_keeps_tail() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        let mut out = vec![0xA5u8; bytes + 8];
        assert_eq!(session.next_frame(&mut out).unwrap(), bytes);
        assert!(out[bytes..].iter().all(|b| *b == 0xA5));
    }

    #[test]
    fn test_geometry_change_drops_frame() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        *backend.script.lock().unwrap() = Script::nv12(8, 4, 32);
        // Let any frame built from the old script pass unarmed
        thread::sleep(Duration::from_millis(20));

        let mut out = vec![0xA5u8; bytes];
        assert_eq!(session.next_frame(&mut out).unwrap(), 0);
        assert!(out.iter().all(|b| *b == 0xA5));

        let stats = session.stats();
        assert_eq!(stats.short, 1);
        assert!(stats.rejected >= 1);

        // Initial geometry comes back: frames flow again
        *backend.script.lock().unwrap() = Script::nv12(8, 4, 16);
        thread::sleep(Duration::from_millis(20));
        assert_eq!(session.next_frame(&mut out).unwrap(), bytes);
    }

    #[test]
    fn test_finish_stops_device_once() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let session = CaptureSession::open(&backend, "").unwrap();
        assert!(!backend.stopped.load(Ordering::SeqCst));

        session.finish();
        assert!(backend.stopped.load(Ordering::SeqCst));
    }

    #[test]
    fn test_pull_after_device_died() {
        let backend = ScriptedBackend::new(Script::nv12(8, 4, 16));
        let mut session = CaptureSession::open(&backend, "").unwrap();
        let bytes = session.geometry().bytes;

        session.device.stop();

        let mut out = vec![0u8; bytes];
        assert!(matches!(session.next_frame(&mut out), Err(Error::Closed)));
    }

    #[test]
    fn test_observer_counts_late_frames() {
        let (_caller, responder) = rendezvous::pair();
        let counters = Arc::new(CaptureCounters::default());
        let mut observer = FrameObserver::new(responder, counters.clone());

        let luma = [0u8; 8];
        let chroma = [0u8; 4];
        let sample = SampleBuffer {
            num_samples: 1,
            image: Some(PixelBuffer {
                format: PixelFormat::Nv12,
                width: 4,
                height: 2,
                planes: vec![
                    Plane {
                        data: &luma,
                        bytes_per_row: 4,
                        width: 4,
                        height: 2,
                    },
                    Plane {
                        data: &chroma,
                        bytes_per_row: 4,
                        width: 4,
                        height: 1,
                    },
                ],
            }),
        };

        observer.on_sample(&sample);
        observer.on_sample(&sample);

        assert_eq!(counters.snapshot().late, 2);
        assert!(observer.geometry.is_empty());
    }
}
