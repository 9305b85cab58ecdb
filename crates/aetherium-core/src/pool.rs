//! Bounded energy store with per-step transfer caps.
//!
//! External transfers (`receive` / `extract`) are rate limited and support
//! a dry-run `simulate` flag. The owning converter uses the unrestricted
//! internal helpers (`force_set`, `add_direct`, `drain`) for generation and
//! recipe debits, since a machine powering itself is not an external
//! transfer.
//!
//! Converters detect pool changes through [`ResourcePool::revision`]. The
//! optional listener is for embedders that want a push notification.

use serde::{Deserialize, Serialize};

/// Called with `(old, new)` whenever a committed operation changes `stored`.
pub type PoolListener = Box<dyn FnMut(u64, u64)>;

#[derive(Serialize, Deserialize)]
#[serde(from = "PoolFields")]
pub struct ResourcePool {
    capacity: u64,
    stored: u64,
    max_input_rate: u64,
    max_output_rate: u64,
    /// Bumped on every committed change to `stored`.
    #[serde(default)]
    revision: u64,
    #[serde(skip)]
    listener: Option<PoolListener>,
}

/// Serialized form of a pool. `stored` is clamped to `capacity` on the way in.
#[derive(Deserialize)]
struct PoolFields {
    capacity: u64,
    stored: u64,
    max_input_rate: u64,
    max_output_rate: u64,
    #[serde(default)]
    revision: u64,
}

impl From<PoolFields> for ResourcePool {
    fn from(fields: PoolFields) -> Self {
        let mut pool = Self::with_stored(
            fields.capacity,
            fields.max_input_rate,
            fields.max_output_rate,
            fields.stored,
        );
        pool.revision = fields.revision;
        pool
    }
}

impl std::fmt::Debug for ResourcePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResourcePool")
            .field("capacity", &self.capacity)
            .field("stored", &self.stored)
            .field("max_input_rate", &self.max_input_rate)
            .field("max_output_rate", &self.max_output_rate)
            .field("revision", &self.revision)
            .field("listener", &self.listener.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

/// Clones carry the numbers only; listeners are not shared.
impl Clone for ResourcePool {
    fn clone(&self) -> Self {
        Self {
            capacity: self.capacity,
            stored: self.stored,
            max_input_rate: self.max_input_rate,
            max_output_rate: self.max_output_rate,
            revision: self.revision,
            listener: None,
        }
    }
}

impl PartialEq for ResourcePool {
    fn eq(&self, other: &Self) -> bool {
        self.capacity == other.capacity
            && self.stored == other.stored
            && self.max_input_rate == other.max_input_rate
            && self.max_output_rate == other.max_output_rate
    }
}

impl ResourcePool {
    /// An empty pool. A rate of 0 disables that direction for external callers.
    pub fn new(capacity: u64, max_input_rate: u64, max_output_rate: u64) -> Self {
        Self {
            capacity,
            stored: 0,
            max_input_rate,
            max_output_rate,
            revision: 0,
            listener: None,
        }
    }

    /// Same as [`new`](Self::new) with an initial charge, clamped to capacity.
    pub fn with_stored(capacity: u64, max_input_rate: u64, max_output_rate: u64, stored: u64) -> Self {
        let mut pool = Self::new(capacity, max_input_rate, max_output_rate);
        pool.stored = stored.min(capacity);
        pool
    }

    pub fn set_listener(&mut self, listener: PoolListener) {
        self.listener = Some(listener);
    }

    pub fn clear_listener(&mut self) {
        self.listener = None;
    }

    // -----------------------------------------------------------------------
    // External transfers
    // -----------------------------------------------------------------------

    /// Accept up to `amount`, capped by the input rate and free space.
    /// Returns the amount accepted (or that would be, when simulating).
    pub fn receive(&mut self, amount: u64, simulate: bool) -> u64 {
        let accepted = amount
            .min(self.max_input_rate)
            .min(self.free_space());
        if !simulate && accepted > 0 {
            self.commit(self.stored + accepted);
        }
        accepted
    }

    /// Remove up to `amount`, capped by the output rate and the charge.
    /// Returns the amount removed (or that would be, when simulating).
    pub fn extract(&mut self, amount: u64, simulate: bool) -> u64 {
        let removed = amount.min(self.max_output_rate).min(self.stored);
        if !simulate && removed > 0 {
            self.commit(self.stored - removed);
        }
        removed
    }

    // -----------------------------------------------------------------------
    // Internal adjustments (bypass rate caps)
    // -----------------------------------------------------------------------

    /// Overwrite the charge, clamped to `[0, capacity]`.
    pub fn force_set(&mut self, value: u64) {
        let value = value.min(self.capacity);
        if value != self.stored {
            self.commit(value);
        }
    }

    /// Add generated energy, clamped to capacity. Returns the amount added.
    pub fn add_direct(&mut self, amount: u64) -> u64 {
        let before = self.stored;
        self.force_set(self.stored.saturating_add(amount));
        self.stored - before
    }

    /// Debit `amount` in full, or nothing. Returns whether the debit happened.
    pub fn drain(&mut self, amount: u64) -> bool {
        if amount > self.stored {
            return false;
        }
        if amount > 0 {
            self.commit(self.stored - amount);
        }
        true
    }

    fn commit(&mut self, value: u64) {
        let old = self.stored;
        self.stored = value;
        self.revision = self.revision.wrapping_add(1);
        if let Some(listener) = self.listener.as_mut() {
            listener(old, value);
        }
    }

    // -----------------------------------------------------------------------
    // Read access
    // -----------------------------------------------------------------------

    pub fn stored(&self) -> u64 {
        self.stored
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    pub fn max_input_rate(&self) -> u64 {
        self.max_input_rate
    }

    pub fn max_output_rate(&self) -> u64 {
        self.max_output_rate
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn free_space(&self) -> u64 {
        self.capacity.saturating_sub(self.stored)
    }

    pub fn is_full(&self) -> bool {
        self.stored >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.stored == 0
    }

    /// Whether an external caller could push `amount` in one call.
    pub fn can_receive(&self, amount: u64) -> bool {
        self.max_input_rate > 0 && amount <= self.max_input_rate && amount <= self.free_space()
    }

    /// Whether an external caller could pull `amount` in one call.
    pub fn can_extract(&self, amount: u64) -> bool {
        self.max_output_rate > 0 && amount <= self.max_output_rate && amount <= self.stored
    }

    pub fn fill_percent(&self) -> u8 {
        crate::fixed::percent(self.stored, self.capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn receive_is_capped_by_rate_and_space() {
        let mut pool = ResourcePool::new(1000, 100, 0);
        assert_eq!(pool.receive(250, false), 100);
        assert_eq!(pool.stored(), 100);

        let mut nearly_full = ResourcePool::with_stored(1000, 500, 0, 950);
        assert_eq!(nearly_full.receive(500, false), 50);
        assert!(nearly_full.is_full());
        assert_eq!(nearly_full.receive(1, false), 0);
    }

    #[test]
    fn extract_is_capped_by_rate_and_charge() {
        let mut pool = ResourcePool::with_stored(1000, 0, 40, 30);
        assert_eq!(pool.extract(100, false), 30);
        assert!(pool.is_empty());
        assert_eq!(pool.extract(100, false), 0);

        let mut rich = ResourcePool::with_stored(1000, 0, 40, 900);
        assert_eq!(rich.extract(100, false), 40);
        assert_eq!(rich.stored(), 860);
    }

    #[test]
    fn zero_rates_disable_directions() {
        let mut pool = ResourcePool::with_stored(1000, 0, 0, 500);
        assert_eq!(pool.receive(10, false), 0);
        assert_eq!(pool.extract(10, false), 0);
        assert!(!pool.can_receive(1));
        assert!(!pool.can_extract(1));
        assert_eq!(pool.stored(), 500);
    }

    #[test]
    fn simulate_reports_without_mutating() {
        let mut pool = ResourcePool::with_stored(1000, 100, 100, 500);
        let revision = pool.revision();
        assert_eq!(pool.receive(80, true), 80);
        assert_eq!(pool.extract(80, true), 80);
        assert_eq!(pool.stored(), 500);
        assert_eq!(pool.revision(), revision);
    }

    #[test]
    fn force_set_clamps_to_capacity() {
        let mut pool = ResourcePool::new(100, 0, 0);
        pool.force_set(1_000);
        assert_eq!(pool.stored(), 100);
        pool.force_set(0);
        assert_eq!(pool.stored(), 0);
    }

    #[test]
    fn add_direct_ignores_input_rate() {
        let mut pool = ResourcePool::with_stored(100, 0, 0, 90);
        assert_eq!(pool.add_direct(20), 10);
        assert_eq!(pool.stored(), 100);
    }

    #[test]
    fn drain_is_all_or_nothing() {
        let mut pool = ResourcePool::with_stored(100, 0, 0, 10);
        assert!(!pool.drain(11));
        assert_eq!(pool.stored(), 10);
        assert!(pool.drain(10));
        assert!(pool.is_empty());
        assert!(pool.drain(0));
    }

    #[test]
    fn listener_fires_only_on_committed_changes() {
        let log: Rc<RefCell<Vec<(u64, u64)>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let mut pool = ResourcePool::new(100, 50, 50);
        pool.set_listener(Box::new(move |old, new| sink.borrow_mut().push((old, new))));

        pool.receive(30, true);
        pool.receive(30, false);
        pool.extract(100, false);
        pool.extract(5, false);
        pool.force_set(0);

        assert_eq!(*log.borrow(), vec![(0, 30), (30, 0)]);
    }

    #[test]
    fn clone_drops_listener_and_compares_by_value() {
        let mut pool = ResourcePool::with_stored(100, 10, 10, 40);
        pool.set_listener(Box::new(|_, _| {}));
        let copy = pool.clone();
        assert_eq!(copy, pool);
        assert!(format!("{copy:?}").contains("listener: None"));
    }

    #[test]
    fn fill_percent_reads_charge() {
        let pool = ResourcePool::with_stored(10_000, 0, 0, 2_500);
        assert_eq!(pool.fill_percent(), 25);
    }

    #[test]
    fn deserialized_charge_is_clamped_to_capacity() {
        let json = r#"{"capacity":10,"stored":20,"max_input_rate":5,"max_output_rate":5}"#;
        let mut pool: ResourcePool = serde_json::from_str(json).unwrap();
        assert_eq!(pool.stored(), 10);
        assert_eq!(pool.free_space(), 0);
        assert!(!pool.can_receive(1));
        assert_eq!(pool.receive(1, true), 0);
        assert_eq!(pool.extract(5, false), 5);
        assert_eq!(pool.receive(3, false), 3);
    }

    #[test]
    fn serialized_pool_reads_back() {
        let mut pool = ResourcePool::with_stored(500, 40, 30, 120);
        pool.receive(10, false);
        let back: ResourcePool = serde_json::from_str(&serde_json::to_string(&pool).unwrap()).unwrap();
        assert_eq!(back, pool);
        assert_eq!(back.revision(), pool.revision());
    }
}
