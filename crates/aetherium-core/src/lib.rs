//! Aetherium Core -- the step-driven resource-conversion engine behind
//! generators, crushers, separators and infusers.
//!
//! Every machine is one [`converter::ConverterInstance`]: a bounded energy
//! pool, a role-checked slot inventory, and a state machine that either runs
//! recipes from an injected catalog or burns fuel. What a machine does is
//! data ([`spec::ConverterSpec`]), not code.
//!
//! # Step Cycle
//!
//! The host (normally a [`driver::Driver`]) calls
//! [`converter::ConverterInstance::step`] once per simulation step:
//!
//! 1. **Processors** latch the first matching recipe once the pool holds its
//!    full cost and the outputs have room, then pay the cost a share per step.
//! 2. On the last step the products are drawn, the input consumed and the
//!    outputs deposited. Full outputs hold the run in `Complete`.
//! 3. **Generators** ignite fuel, warm up, then add energy every warm step
//!    while consuming an auxiliary resource on its own cadence.
//! 4. The snapshot is rebuilt and any events are queued for the host.
//!
//! ```rust,ignore
//! let mut driver = Driver::new(seed);
//! let crusher = driver.add(ConverterInstance::new(spec, items)?);
//! driver.step();
//! let view = driver.get(crusher).unwrap().snapshot();
//! ```
//!
//! # Key Types
//!
//! - [`pool::ResourcePool`] -- Bounded, rate-limited energy store.
//! - [`inventory::SlotInventory`] -- Fixed slots tagged with roles and filters.
//! - [`recipe::RecipeCatalog`] -- Frozen recipe set with deterministic matching.
//! - [`converter::ConverterInstance`] -- Per-instance conversion state machine.
//! - [`query::ConverterSnapshot`] -- Read-only view for renderers.
//! - [`capability::CapabilityFacade`] -- Face-filtered access for neighbours.
//! - [`persist::ConverterRecord`] -- Minimal resume record and its encoding.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for probabilities.

pub mod capability;
pub mod converter;
pub mod driver;
pub mod event;
pub mod fixed;
pub mod generator;
pub mod id;
pub mod inventory;
pub mod item;
pub mod persist;
pub mod pool;
pub mod query;
pub mod recipe;
pub mod registry;
pub mod rng;
pub mod spec;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
