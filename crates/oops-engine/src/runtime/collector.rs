//! One-slot collector for diagnostic objects
//!
//! A diagnostic (error) object survives exactly one further completed
//! construction: long enough for a handler to inspect it, after which its
//! chain is purged. The collector only decides *what* to purge; the
//! runtime performs the disposal.

use super::address::Address;

/// Collector statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectorStats {
    /// Completed cycles
    pub cycles: usize,
    /// Diagnostics parked for the next cycle
    pub parked: usize,
    /// Diagnostics handed back for disposal
    pub collected: usize,
}

/// Ring buffer of size one
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    slot: Option<Address>,
    stats: CollectorStats,
}

impl DiagnosticCollector {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one cycle.
    ///
    /// Returns the address parked by the previous cycle, which the caller
    /// must dispose, then parks `diagnostic` (if any) for the next cycle.
    pub fn cycle(&mut self, diagnostic: Option<Address>) -> Option<Address> {
        self.stats.cycles += 1;
        let evicted = self.slot.take();
        if evicted.is_some() {
            self.stats.collected += 1;
        }
        if let Some(address) = diagnostic {
            self.stats.parked += 1;
            self.slot = Some(address);
        }
        evicted
    }

    /// Address waiting for the next cycle
    pub fn pending(&self) -> Option<Address> {
        self.slot
    }

    /// Forget the parked address without disposing it
    pub fn clear(&mut self) {
        self.slot = None;
    }

    /// Statistics so far
    pub fn stats(&self) -> &CollectorStats {
        &self.stats
    }
}
