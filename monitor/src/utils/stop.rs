//! Cooperative stop signal for the periodic monitoring loops.
//!
//! Each loop checks [`StopToken::is_stopped`] at the top of every iteration
//! and waits between ticks with [`StopToken::sleep`], which returns early
//! when a stop is requested. A tick that is already running is never
//! interrupted; stopping takes effect once it finishes.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use void_monitor::utils::stop_signal;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (handle, mut token) = stop_signal();
//!
//!     let task = tokio::spawn(async move {
//!         let mut ticks = 0;
//!         while !token.is_stopped() {
//!             ticks += 1;
//!             token.sleep(Duration::from_secs(3600)).await;
//!         }
//!         ticks
//!     });
//!
//!     handle.stop();
//!     assert!(task.await.unwrap() <= 1);
//! }
//! ```

use std::time::Duration;

use tokio::sync::watch;

/// Creates a connected stop handle and token.
#[must_use]
pub fn stop_signal() -> (StopHandle, StopToken) {
    let (tx, rx) = watch::channel(false);
    (StopHandle(tx), StopToken(rx))
}

/// Requests that every associated loop stop.
#[derive(Debug)]
pub struct StopHandle(watch::Sender<bool>);

impl StopHandle {
    /// Raises the stop flag. Idempotent.
    pub fn stop(&self) {
        self.0.send_replace(true);
    }

    /// Returns another token observing this handle.
    #[must_use]
    pub fn token(&self) -> StopToken {
        StopToken(self.0.subscribe())
    }
}

/// Observes a [`StopHandle`].
#[derive(Debug, Clone)]
pub struct StopToken(watch::Receiver<bool>);

impl StopToken {
    /// Returns true once a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        *self.0.borrow()
    }

    /// Sleeps for `duration`, waking early if a stop is requested.
    ///
    /// Returns true if the loop should stop. A dropped handle counts as a
    /// stop request.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        if self.is_stopped() {
            return true;
        }

        let woken_by_stop = tokio::select! {
            () = tokio::time::sleep(duration) => false,
            // Err means the handle was dropped, which also stops the loop
            _ = self.0.wait_for(|stopped| *stopped) => true,
        };

        woken_by_stop || self.is_stopped()
    }
}
