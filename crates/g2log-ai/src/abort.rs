use tokio::sync::watch;

/// Handle used to request cancellation of an in-flight request.
#[derive(Clone, Debug)]
pub struct AbortHandle {
    tx: watch::Sender<bool>,
}

impl AbortHandle {
    /// Creates a handle and the signal it controls.
    pub fn pair() -> (Self, AbortSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { tx }, AbortSignal { rx })
    }

    /// Requests cancellation.
    ///
    /// The request resolves to `StreamError::Cancelled` at its next suspension
    /// point and writes nothing more to the live sink.
    pub fn abort(&self) {
        let _ = self.tx.send(true);
    }
}

/// Receiving side of an [`AbortHandle`].
#[derive(Clone, Debug)]
pub struct AbortSignal {
    rx: watch::Receiver<bool>,
}

impl AbortSignal {
    /// A signal that never fires.
    pub fn never() -> Self {
        let (_tx, rx) = watch::channel(false);
        Self { rx }
    }

    /// True once abort was requested.
    pub fn is_aborted(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes when abort is requested. Never completes if every handle is
    /// dropped first.
    pub async fn aborted(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

impl Default for AbortSignal {
    fn default() -> Self {
        Self::never()
    }
}
