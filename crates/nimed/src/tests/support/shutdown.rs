//! Shutdown signal fired explicitly by a test.

use std::sync::Mutex;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::shutdown::{ShutdownError, ShutdownSignal};

pub struct ManualShutdown {
    receiver: Mutex<Receiver<()>>,
}

impl ManualShutdown {
    /// Returns the signal and the trigger that releases it.
    pub fn new() -> (Self, Sender<()>) {
        let (sender, receiver) = mpsc::channel();
        (
            Self {
                receiver: Mutex::new(receiver),
            },
            sender,
        )
    }
}

impl ShutdownSignal for ManualShutdown {
    fn wait(&self) -> Result<(), ShutdownError> {
        // A dropped trigger also releases the wait.
        let _ = self
            .receiver
            .lock()
            .expect("shutdown receiver mutex poisoned")
            .recv();
        Ok(())
    }
}
