//! Capacity-1 request/response handoff between a pulling caller and a
//! delivery thread.
//!
//! The caller arms one request and blocks until the responder answers it.
//! The responder never blocks: it polls for an armed request when a frame
//! arrives and drops the frame when nothing is armed.

use crossbeam::channel::{self, Receiver, Sender, TryRecvError};
use std::ptr::NonNull;

use crate::{Error, Result};

/// Caller-owned destination memory lent to the delivery thread for one exchange.
pub struct OutputSlot {
    ptr: NonNull<u8>,
    len: usize,
}

// The slot only travels to the responder while the lending caller is blocked
// in `Caller::exchange`, so the memory is never aliased.
unsafe impl Send for OutputSlot {}

impl OutputSlot {
    /// Lend `buf` for the duration of one exchange.
    pub fn new(buf: &mut [u8]) -> Self {
        Self {
            ptr: NonNull::new(buf.as_mut_ptr()).unwrap_or(NonNull::dangling()),
            len: buf.len(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the lent memory.
    ///
    /// # Safety
    /// Must only be called by the responder between receiving the request
    /// and answering it.
    pub unsafe fn as_mut_slice(&mut self) -> &mut [u8] {
        std::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.len)
    }
}

/// An armed pull. `slot` is `None` when the caller only wants the answer,
/// without any payload copied.
pub struct Request {
    pub slot: Option<OutputSlot>,
}

/// Create a connected caller/responder pair.
pub fn pair<R: Send>() -> (Caller<R>, Responder<R>) {
    let (arm_tx, arm_rx) = channel::bounded(1);
    let (done_tx, done_rx) = channel::bounded(1);
    (
        Caller {
            arm: arm_tx,
            done: done_rx,
        },
        Responder {
            arm: arm_rx,
            done: done_tx,
        },
    )
}

/// Foreground side: arms a request and waits for the reply.
pub struct Caller<R> {
    arm: Sender<Request>,
    done: Receiver<R>,
}

impl<R> Caller<R> {
    /// Arm `slot`, then block until the responder has answered.
    ///
    /// There is no timeout. Fails only when the responder has gone away.
    pub fn exchange(&self, slot: Option<OutputSlot>) -> Result<R> {
        self.arm
            .send(Request { slot })
            .map_err(|_| Error::Closed)?;
        self.done.recv().map_err(|_| Error::Closed)
    }
}

/// Delivery side: answers at most one armed request per frame.
pub struct Responder<R> {
    arm: Receiver<Request>,
    done: Sender<R>,
}

impl<R> Responder<R> {
    /// Take the armed request, if any, without blocking.
    pub fn poll(&self) -> Option<Request> {
        match self.arm.try_recv() {
            Ok(request) => Some(request),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Answer the request taken by the last `poll`.
    ///
    /// The request's slot must already be dropped.
    pub fn respond(&self, reply: R) {
        // At most one reply is ever outstanding, so this never blocks.
        if self.done.send(reply).is_err() {
            tracing::debug!(target: "avbridge", "caller went away before reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_poll_without_arm_is_empty() {
        let (_caller, responder) = pair::<usize>();
        assert!(responder.poll().is_none());
    }

    #[test]
    fn test_exchange_writes_through_slot() {
        let (caller, responder) = pair::<usize>();

        let worker = thread::spawn(move || loop {
            if let Some(mut request) = responder.poll() {
                let written = match request.slot.as_mut() {
                    Some(slot) => {
                        let out = unsafe { slot.as_mut_slice() };
                        out.fill(7);
                        out.len()
                    }
                    None => 0,
                };
                drop(request);
                responder.respond(written);
                return;
            }
            thread::sleep(Duration::from_millis(1));
        });

        let mut buf = vec![0u8; 16];
        let written = caller.exchange(Some(OutputSlot::new(&mut buf))).unwrap();
        worker.join().unwrap();

        assert_eq!(written, 16);
        assert!(buf.iter().all(|b| *b == 7));
    }

    #[test]
    fn test_exchange_without_slot() {
        let (caller, responder) = pair::<&'static str>();

        let worker = thread::spawn(move || loop {
            if let Some(request) = responder.poll() {
                assert!(request.slot.is_none());
                responder.respond("geometry");
                return;
            }
            thread::yield_now();
        });

        assert_eq!(caller.exchange(None).unwrap(), "geometry");
        worker.join().unwrap();
    }

    #[test]
    fn test_exchange_after_responder_dropped() {
        let (caller, responder) = pair::<usize>();
        drop(responder);
        assert!(matches!(caller.exchange(None), Err(Error::Closed)));
    }

    #[test]
    fn test_responder_dropped_while_armed() {
        let (caller, responder) = pair::<usize>();

        let worker = thread::spawn(move || {
            // Give the caller time to arm, then go away without answering
            thread::sleep(Duration::from_millis(20));
            drop(responder);
        });

        assert!(matches!(caller.exchange(None), Err(Error::Closed)));
        worker.join().unwrap();
    }
}
