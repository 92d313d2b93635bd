//! Keeping the module resident after registration.
//!
//! Once everything is registered the module must not exit, or the host loses
//! every binding. Natively that means parking the main thread until someone
//! outside asks us to stop. On wasm32 the host's event loop already keeps the
//! instance alive, so the guard only tracks state and performs the orderly
//! unregistration when a shutdown is requested.

use crossbeam::atomic::AtomicCell;
use crossbeam::channel::{self, Receiver, Sender};
use log::info;
use strum_macros::Display;

use crate::registrar::{HostNamespace, Registrar};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum ResidencyState {
    Initializing,
    Resident,
    Released,
}

/// Why residency ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ShutdownSignal {
    /// Asked for programmatically, e.g. through the exported `shutdown()`.
    Requested,
    /// Ctrl+C or a termination signal.
    Interrupted,
    /// The host driving the calls went away.
    HostClosed,
}

/// Lets code outside the guard end residency.
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: Sender<ShutdownSignal>,
}

impl ShutdownHandle {
    /// Returns false if the guard is already gone.
    pub fn request(&self, signal: ShutdownSignal) -> bool {
        self.tx.send(signal).is_ok()
    }
}

pub struct ResidencyGuard {
    state: AtomicCell<ResidencyState>,
    released_by: AtomicCell<Option<ShutdownSignal>>,
    // Keeping our own sender means the channel never disconnects, so the
    // only way out of `block_forever` is an actual signal.
    tx: Sender<ShutdownSignal>,
    rx: Receiver<ShutdownSignal>,
}

impl Default for ResidencyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl ResidencyGuard {
    pub fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self {
            state: AtomicCell::new(ResidencyState::Initializing),
            released_by: AtomicCell::new(None),
            tx,
            rx,
        }
    }

    pub fn state(&self) -> ResidencyState {
        self.state.load()
    }

    /// The signal that ended residency, once released.
    pub fn released_by(&self) -> Option<ShutdownSignal> {
        self.released_by.load()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.tx.clone(),
        }
    }

    /// Mark registration as finished. Only moves forward from `Initializing`.
    pub fn enter(&self) {
        if self
            .state
            .compare_exchange(ResidencyState::Initializing, ResidencyState::Resident)
            .is_ok()
        {
            info!("Module resident");
        }
    }

    /// Park the calling thread until a shutdown signal arrives, then unregister
    /// everything. Returns immediately if residency already ended.
    pub fn block_forever<N: HostNamespace>(&self, registrar: &mut Registrar<N>) -> ShutdownSignal {
        if let Some(signal) = self.released_by() {
            return signal;
        }
        self.enter();
        let signal = match self.rx.recv() {
            Ok(signal) => signal,
            // unreachable while we hold `tx`
            Err(_) => ShutdownSignal::HostClosed,
        };
        self.release(registrar, signal);
        signal
    }

    /// Unregister every binding and end residency. Returns the removed names,
    /// which is empty if residency had already ended.
    pub fn release<N: HostNamespace>(
        &self,
        registrar: &mut Registrar<N>,
        signal: ShutdownSignal,
    ) -> Vec<String> {
        if self.state.swap(ResidencyState::Released) == ResidencyState::Released {
            return Vec::new();
        }
        info!("Shutdown signal received ({signal}), releasing bindings");
        self.released_by.store(Some(signal));
        registrar.unregister_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BridgeConfig;
    use crate::handlers::{PROCESS_DATA, register_defaults};
    use crate::registrar::tests::RecordingNamespace;
    use crate::registry::Registry;
    use crate::value::HostValue;
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    fn registrar() -> Registrar<RecordingNamespace> {
        let mut registrar = Registrar::new(Arc::new(Registry::new()), RecordingNamespace::default());
        register_defaults(&mut registrar, &BridgeConfig::default()).unwrap();
        registrar
    }

    #[test]
    fn test_state_transitions() {
        let guard = ResidencyGuard::new();
        assert_eq!(guard.state(), ResidencyState::Initializing);

        guard.enter();
        assert_eq!(guard.state(), ResidencyState::Resident);
        assert_eq!(guard.state().to_string(), "resident");
    }

    #[test]
    fn test_signal_before_blocking() {
        let mut registrar = registrar();
        let guard = ResidencyGuard::new();
        assert!(guard.shutdown_handle().request(ShutdownSignal::Requested));

        assert_eq!(guard.block_forever(&mut registrar), ShutdownSignal::Requested);
        assert_eq!(guard.state(), ResidencyState::Released);
        assert!(registrar.registry().is_empty());
        assert_eq!(registrar.namespace().removed, vec![PROCESS_DATA]);
    }

    #[test]
    fn test_bindings_callable_while_resident() {
        let mut registrar = registrar();
        let registry = registrar.registry().clone();
        let guard = ResidencyGuard::new();
        let handle = guard.shutdown_handle();

        let host = std::thread::spawn(move || {
            // wait until the main context is parked
            std::thread::sleep(Duration::from_millis(20));
            let outputs: Vec<HostValue> = ["a", "b", "c"]
                .into_iter()
                .map(|input| registry.invoke(PROCESS_DATA, &[input.into()]).unwrap())
                .collect();
            handle.request(ShutdownSignal::HostClosed);
            outputs
        });

        assert_eq!(guard.block_forever(&mut registrar), ShutdownSignal::HostClosed);
        assert_eq!(
            host.join().unwrap(),
            vec![
                HostValue::from("Processed: a"),
                HostValue::from("Processed: b"),
                HostValue::from("Processed: c"),
            ]
        );
        assert_eq!(guard.state(), ResidencyState::Released);
    }

    #[test]
    fn test_blocks_until_signalled() {
        let mut registrar = registrar();
        let guard = ResidencyGuard::new();
        let delay = Duration::from_millis(50);
        let started = Instant::now();

        let signal = std::thread::scope(|s| {
            let guard = &guard;
            s.spawn(move || {
                std::thread::sleep(delay);
                // still parked and still serving
                assert_eq!(guard.state(), ResidencyState::Resident);
                guard.shutdown_handle().request(ShutdownSignal::Interrupted);
            });
            guard.block_forever(&mut registrar)
        });

        assert_eq!(signal, ShutdownSignal::Interrupted);
        assert!(started.elapsed() >= delay);
        assert_eq!(guard.released_by(), Some(ShutdownSignal::Interrupted));
    }

    #[test]
    fn test_release_is_final() {
        let mut registrar = registrar();
        let guard = ResidencyGuard::new();
        guard.enter();

        assert_eq!(
            guard.release(&mut registrar, ShutdownSignal::Requested),
            vec![PROCESS_DATA]
        );
        guard.enter();
        assert_eq!(guard.state(), ResidencyState::Released);

        // a second release neither unregisters again nor changes the cause
        assert!(guard.release(&mut registrar, ShutdownSignal::Interrupted).is_empty());
        assert_eq!(registrar.namespace().removed, vec![PROCESS_DATA]);

        // returns at once instead of parking on an empty registry
        assert_eq!(guard.block_forever(&mut registrar), ShutdownSignal::Requested);
        assert_eq!(guard.state(), ResidencyState::Released);
        assert_eq!(guard.released_by(), Some(ShutdownSignal::Requested));
    }

    #[test]
    fn test_handle_outlives_guard() {
        let handle = ResidencyGuard::new().shutdown_handle();
        // the guard's receiver is gone
        assert!(!handle.request(ShutdownSignal::Requested));
    }
}
