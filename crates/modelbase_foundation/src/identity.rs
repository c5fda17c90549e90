//! Process-wide unique identifier issuance.
//!
//! Identifiers are scoped by a (session, service) pair so that services
//! running concurrently against the same document store never collide:
//!
//! ```text
//! bit 63      62..48       47..32        31..0
//!  0       session(15)   service(16)   counter(32)
//! ```
//!
//! The top bit is always clear, so every identifier is a positive `i64`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use once_cell::sync::OnceCell;

use crate::{Error, ErrorKind, Result};

/// Largest session id that fits the identifier layout.
pub const MAX_SESSION_ID: u16 = (1 << 15) - 1;

const COUNTER_BITS: u32 = 32;
const SERVICE_SHIFT: u32 = COUNTER_BITS;
const SESSION_SHIFT: u32 = COUNTER_BITS + 16;
const COUNTER_LIMIT: u64 = 1 << COUNTER_BITS;

/// Issues unique, monotonically increasing 64-bit identifiers.
///
/// Safe to share between threads; the counter is a single atomic.
#[derive(Debug)]
pub struct IdentityGenerator {
    session: u16,
    service: u16,
    counter: AtomicU64,
}

impl IdentityGenerator {
    /// Creates a generator for one (session, service) scope.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if `session` exceeds [`MAX_SESSION_ID`].
    pub fn new(session: u16, service: u16) -> Result<Self> {
        if session > MAX_SESSION_ID {
            return Err(Error::precondition(format!(
                "session id {session} exceeds {MAX_SESSION_ID}"
            )));
        }
        Ok(Self {
            session,
            service,
            counter: AtomicU64::new(1),
        })
    }

    /// Returns the next identifier. Never returns zero.
    ///
    /// # Errors
    ///
    /// Returns [`ErrorKind::IdentityExhausted`] once the 32-bit counter is used up.
    pub fn next(&self) -> Result<u64> {
        let counter = self.counter.fetch_add(1, Ordering::Relaxed);
        if counter >= COUNTER_LIMIT {
            return Err(Error::new(ErrorKind::IdentityExhausted {
                session: self.session,
                service: self.service,
            }));
        }
        Ok(self.prefix() | counter)
    }

    /// Returns the session id of this scope.
    #[must_use]
    pub fn session(&self) -> u16 {
        self.session
    }

    /// Returns the service id of this scope.
    #[must_use]
    pub fn service(&self) -> u16 {
        self.service
    }

    /// Returns true if `id` was issued from this generator's scope.
    #[must_use]
    pub fn owns(&self, id: u64) -> bool {
        id != 0 && id & !(COUNTER_LIMIT - 1) == self.prefix()
    }

    fn prefix(&self) -> u64 {
        (u64::from(self.session) << SESSION_SHIFT) | (u64::from(self.service) << SERVICE_SHIFT)
    }
}

/// Holds the one generator a process uses, installed explicitly at startup.
///
/// The cell is passed by handle to whatever needs identifiers; it is never a
/// global. Installing the same generator twice is accepted, a different one
/// is rejected.
#[derive(Debug, Default)]
pub struct IdentityCell {
    generator: OnceCell<Arc<IdentityGenerator>>,
}

impl IdentityCell {
    /// Creates an empty cell.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a cell that already holds `generator`.
    #[must_use]
    pub fn with_generator(generator: Arc<IdentityGenerator>) -> Self {
        let cell = OnceCell::new();
        let _ = cell.set(generator);
        Self { generator: cell }
    }

    /// Installs the generator.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if a different generator is already installed.
    pub fn install(&self, generator: Arc<IdentityGenerator>) -> Result<()> {
        let installed = self.generator.get_or_init(|| {
            tracing::debug!(
                session = generator.session(),
                service = generator.service(),
                "identity generator installed"
            );
            Arc::clone(&generator)
        });
        if Arc::ptr_eq(installed, &generator) {
            Ok(())
        } else {
            Err(Error::precondition(
                "a different identity generator is already installed",
            ))
        }
    }

    /// Returns true once a generator has been installed.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.generator.get().is_some()
    }

    /// Returns the installed generator.
    ///
    /// # Errors
    ///
    /// Returns a precondition violation if no generator was installed.
    pub fn get(&self) -> Result<&Arc<IdentityGenerator>> {
        self.generator
            .get()
            .ok_or_else(|| Error::precondition("identity generator used before installation"))
    }

    /// Issues the next identifier from the installed generator.
    ///
    /// # Errors
    ///
    /// Fails if no generator was installed or the counter is exhausted.
    pub fn next(&self) -> Result<u64> {
        self.get()?.next()
    }
}
