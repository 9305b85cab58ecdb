//! Converter events and the bounded queue they are delivered through.
//!
//! State changes that a presentation layer cares about (a run finishing, a
//! generator warming up) are pushed onto a per-converter [`EventQueue`]
//! during the step and drained afterwards. The engine itself performs no
//! I/O beyond `tracing` diagnostics.

use crate::fixed::Steps;
use crate::generator::GeneratorPhase;
use crate::id::{ItemTypeId, RecipeId};
use crate::item::ResourceUnit;

/// Queue capacity used by [`ConverterInstance`](crate::converter::ConverterInstance).
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

// ---------------------------------------------------------------------------
// Event types
// ---------------------------------------------------------------------------

/// Why a run was abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum AbortReason {
    /// The input slot no longer satisfies the recipe.
    InputMissing,
    /// The pool could not pay this step's energy share.
    InsufficientEnergy,
}

/// Something that happened inside one converter. All events carry the local
/// step at which they occurred.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ConverterEvent {
    // -- Recipe runs --
    RunStarted {
        recipe: RecipeId,
        step: Steps,
    },
    RunCompleted {
        recipe: RecipeId,
        consumed: ResourceUnit,
        primary: ResourceUnit,
        secondary: Option<ResourceUnit>,
        step: Steps,
    },
    RunAborted {
        recipe: RecipeId,
        reason: AbortReason,
        step: Steps,
    },
    /// A finished run cannot deposit its products.
    OutputBlocked {
        recipe: RecipeId,
        step: Steps,
    },

    // -- Generators --
    FuelIgnited {
        fuel: ItemTypeId,
        burn_steps: u32,
        step: Steps,
    },
    AuxiliaryRefilled {
        source: ItemTypeId,
        level: u32,
        step: Steps,
    },
    PhaseChanged {
        from: GeneratorPhase,
        to: GeneratorPhase,
        step: Steps,
    },
}

/// Discriminant tag for event types, used for filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    RunStarted,
    RunCompleted,
    RunAborted,
    OutputBlocked,
    FuelIgnited,
    AuxiliaryRefilled,
    PhaseChanged,
}

impl ConverterEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ConverterEvent::RunStarted { .. } => EventKind::RunStarted,
            ConverterEvent::RunCompleted { .. } => EventKind::RunCompleted,
            ConverterEvent::RunAborted { .. } => EventKind::RunAborted,
            ConverterEvent::OutputBlocked { .. } => EventKind::OutputBlocked,
            ConverterEvent::FuelIgnited { .. } => EventKind::FuelIgnited,
            ConverterEvent::AuxiliaryRefilled { .. } => EventKind::AuxiliaryRefilled,
            ConverterEvent::PhaseChanged { .. } => EventKind::PhaseChanged,
        }
    }

    pub fn step(&self) -> Steps {
        match self {
            ConverterEvent::RunStarted { step, .. }
            | ConverterEvent::RunCompleted { step, .. }
            | ConverterEvent::RunAborted { step, .. }
            | ConverterEvent::OutputBlocked { step, .. }
            | ConverterEvent::FuelIgnited { step, .. }
            | ConverterEvent::AuxiliaryRefilled { step, .. }
            | ConverterEvent::PhaseChanged { step, .. } => *step,
        }
    }
}

// ---------------------------------------------------------------------------
// EventQueue: pre-allocated ring buffer
// ---------------------------------------------------------------------------

/// A pre-allocated ring buffer for events. Fixed capacity; when full, the
/// oldest events are dropped.
#[derive(Debug, Clone)]
pub struct EventQueue {
    events: Vec<Option<ConverterEvent>>,
    /// Next write position.
    head: usize,
    len: usize,
    /// Total events ever pushed, dropped ones included.
    total_written: u64,
    dropped: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}

impl EventQueue {
    /// A capacity of 0 is clamped to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
            total_written: 0,
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: ConverterEvent) {
        if self.len == self.capacity() {
            self.dropped += 1;
        } else {
            self.len += 1;
        }
        self.events[self.head] = Some(event);
        self.head = (self.head + 1) % self.capacity();
        self.total_written += 1;
    }

    pub fn capacity(&self) -> usize {
        self.events.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn total_written(&self) -> u64 {
        self.total_written
    }

    /// Events overwritten before anyone drained them, since creation.
    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }

    fn oldest(&self) -> usize {
        if self.len < self.capacity() { 0 } else { self.head }
    }

    /// Oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = &ConverterEvent> {
        let start = self.oldest();
        let capacity = self.capacity();
        (0..self.len).filter_map(move |i| self.events[(start + i) % capacity].as_ref())
    }

    /// Take every queued event, oldest first, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<ConverterEvent> {
        let start = self.oldest();
        let capacity = self.capacity();
        let drained = (0..self.len)
            .filter_map(|i| self.events[(start + i) % capacity].take())
            .collect();
        self.head = 0;
        self.len = 0;
        drained
    }

    pub fn clear(&mut self) {
        for slot in &mut self.events {
            *slot = None;
        }
        self.head = 0;
        self.len = 0;
    }
}
