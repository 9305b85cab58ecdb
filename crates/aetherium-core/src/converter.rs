//! The per-instance conversion state machine.
//!
//! One [`ConverterInstance`] type serves every machine. Its
//! [`ConverterSpec`] decides whether it runs recipes or burns fuel. The host
//! calls [`step`](ConverterInstance::step) once per simulation step and
//! [`on_remove`](ConverterInstance::on_remove) when the converter leaves the
//! world.
//!
//! # Recipe runs
//!
//! ```text
//! Idle ──match + energy + room──▶ Starting ──▶ Processing ──progress == duration──▶ Complete
//!   ▲                                │              │                                 │
//!   └──────── input gone / energy short ────────────┘          deposit ok ───────────┤
//!   └──────────────────────────────────── no next match ◀────────────────────────────┘
//! ```
//!
//! Energy is debited a share at a time while processing, and the shares of
//! one run add up to exactly the recipe's cost. An aborted run is not
//! refunded. A finished run that cannot deposit holds in `Complete` and
//! retries every step without consuming input or dropping product.

use crate::capability::CapabilityFacade;
use crate::event::{AbortReason, ConverterEvent, EventQueue};
use crate::fixed::Steps;
use crate::generator::{GeneratorContext, GeneratorState};
use crate::id::RecipeId;
use crate::inventory::SlotInventory;
use crate::item::ResourceUnit;
use crate::pool::ResourcePool;
use crate::query::ConverterSnapshot;
use crate::recipe::{Recipe, RecipeCatalog};
use crate::registry::ItemCatalog;
use crate::rng::SimRng;
use crate::spec::{ConverterKind, ConverterSpec, GeneratorSpec, SlotLayout, SpecError};
use std::sync::Arc;
use tracing::{debug, info, trace};

/// Lifecycle of a recipe run. Generators stay `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub enum ConverterState {
    #[default]
    Idle,
    /// A recipe is latched but no step of it has run yet.
    Starting,
    Processing,
    /// All steps have run; products are waiting for output room.
    Complete,
}

impl ConverterState {
    /// Whether a recipe is latched.
    pub fn is_processing(self) -> bool {
        self != ConverterState::Idle
    }
}

/// The drawn products of a finished run, kept until they are deposited.
pub type PendingOutputs = (ResourceUnit, Option<ResourceUnit>);

#[derive(Debug)]
pub struct ConverterInstance {
    pub(crate) spec: Arc<ConverterSpec>,
    pub(crate) layout: SlotLayout,
    pub(crate) pool: ResourcePool,
    pub(crate) inventory: SlotInventory,
    pub(crate) state: ConverterState,
    pub(crate) progress: u32,
    pub(crate) active_recipe: Option<RecipeId>,
    pub(crate) pending_outputs: Option<PendingOutputs>,
    /// Output blockage already reported for the current hold.
    pub(crate) blocked: bool,
    pub(crate) generator: Option<GeneratorState>,
    pub(crate) steps: Steps,
    pub(crate) events: EventQueue,
    snapshot: ConverterSnapshot,
    /// Pool and inventory revisions the snapshot was taken at.
    snapshot_revisions: (u64, u64),
}

impl ConverterInstance {
    /// A fresh, empty converter.
    pub fn new(spec: Arc<ConverterSpec>, items: Arc<ItemCatalog>) -> Result<Self, SpecError> {
        let layout = spec.validate(&items)?;
        let pool = ResourcePool::new(spec.capacity, spec.max_input_rate, spec.max_output_rate);
        let inventory = SlotInventory::new(spec.slots.clone(), items);
        let generator = spec.is_generator().then(GeneratorState::default);
        let mut converter = Self {
            spec,
            layout,
            pool,
            inventory,
            state: ConverterState::Idle,
            progress: 0,
            active_recipe: None,
            pending_outputs: None,
            blocked: false,
            generator,
            steps: 0,
            events: EventQueue::default(),
            snapshot: ConverterSnapshot::default(),
            snapshot_revisions: (0, 0),
        };
        converter.refresh_snapshot();
        Ok(converter)
    }

    // -----------------------------------------------------------------------
    // Driver interface
    // -----------------------------------------------------------------------

    /// Advance one step. At most one recipe advances per call.
    pub fn step(&mut self, rng: &mut SimRng) {
        self.steps += 1;
        let spec = Arc::clone(&self.spec);
        match &spec.kind {
            ConverterKind::Processor { catalog } => self.step_processor(catalog, rng),
            ConverterKind::Generator(generator) => self.step_generator(generator),
        }
        self.refresh_snapshot();
    }

    /// Empty the converter for removal. The run in progress, if any, is
    /// dropped without product and every stored item is handed back.
    pub fn on_remove(&mut self) -> Vec<ResourceUnit> {
        if self.state.is_processing() {
            debug!("{} removed while running", self.spec.name);
        }
        self.reset_run();
        let contents = self.inventory.drain_all();
        self.refresh_snapshot();
        contents
    }

    // -----------------------------------------------------------------------
    // Recipe processing
    // -----------------------------------------------------------------------

    fn step_processor(&mut self, catalog: &RecipeCatalog, rng: &mut SimRng) {
        match self.state {
            ConverterState::Idle => {
                if let Some(recipe) = self.try_latch(catalog) {
                    self.advance(catalog, recipe, rng);
                }
            }
            ConverterState::Starting | ConverterState::Processing => {
                match self.active_recipe.and_then(|id| catalog.get(id)) {
                    Some(recipe) => self.advance(catalog, recipe, rng),
                    None => self.reset_run(),
                }
            }
            ConverterState::Complete => match self.active_recipe.and_then(|id| catalog.get(id)) {
                Some(recipe) => self.try_complete(catalog, recipe, rng),
                None => self.reset_run(),
            },
        }
    }

    /// Latch the first matching recipe if the pool holds its full cost and
    /// the outputs have room for its largest possible product.
    fn try_latch<'c>(&mut self, catalog: &'c RecipeCatalog) -> Option<&'c Recipe> {
        let recipe = catalog.find_match(self.inventory.peek(self.layout.input))?;
        if self.pool.stored() < recipe.energy_cost {
            return None;
        }
        let secondary = recipe.secondary_output.as_ref().map(|b| b.output);
        if !self.outputs_fit(recipe.primary_output, secondary) {
            return None;
        }

        self.state = ConverterState::Starting;
        self.progress = 0;
        self.active_recipe = Some(recipe.id);
        debug!("{} started {} at step {}", self.spec.name, recipe.name, self.steps);
        self.events.push(ConverterEvent::RunStarted {
            recipe: recipe.id,
            step: self.steps,
        });
        Some(recipe)
    }

    /// Run one step of the active recipe.
    fn advance(&mut self, catalog: &RecipeCatalog, recipe: &Recipe, rng: &mut SimRng) {
        if !recipe.input.accepts(self.inventory.peek(self.layout.input)) {
            self.abort(recipe, AbortReason::InputMissing);
            return;
        }
        let share = recipe.energy_share(self.progress + 1);
        if !self.pool.drain(share) {
            self.abort(recipe, AbortReason::InsufficientEnergy);
            return;
        }

        self.progress += 1;
        self.state = ConverterState::Processing;
        if self.progress >= recipe.duration_steps {
            self.state = ConverterState::Complete;
            self.pending_outputs = Some(recipe.resolve_outputs(rng));
            self.try_complete(catalog, recipe, rng);
        }
    }

    /// Consume the input and deposit the products, or hold if they do not
    /// fit yet.
    fn try_complete(&mut self, catalog: &RecipeCatalog, recipe: &Recipe, rng: &mut SimRng) {
        if !recipe.input.accepts(self.inventory.peek(self.layout.input)) {
            self.abort(recipe, AbortReason::InputMissing);
            return;
        }
        let (primary, secondary) = *self
            .pending_outputs
            .get_or_insert_with(|| recipe.resolve_outputs(rng));

        if !self.outputs_fit(primary, secondary) {
            if !self.blocked {
                self.blocked = true;
                trace!("{} holding {}: outputs full", self.spec.name, recipe.name);
                self.events.push(ConverterEvent::OutputBlocked {
                    recipe: recipe.id,
                    step: self.steps,
                });
            }
            return;
        }

        let Some(consumed) = self.inventory.consume(self.layout.input, recipe.input.count) else {
            self.abort(recipe, AbortReason::InputMissing);
            return;
        };
        self.deposit(self.layout.output_primary, primary);
        if let Some(unit) = secondary {
            self.deposit(self.layout.output_secondary, unit);
        }

        info!(
            "{} completed {}: {:?} + {:?}",
            self.spec.name, recipe.name, primary, secondary
        );
        self.events.push(ConverterEvent::RunCompleted {
            recipe: recipe.id,
            consumed,
            primary,
            secondary,
            step: self.steps,
        });

        self.reset_run();
        self.try_latch(catalog);
    }

    fn deposit(&mut self, slot: Option<usize>, unit: ResourceUnit) {
        // Room was checked by `outputs_fit`.
        if let Some(slot) = slot {
            self.inventory.deposit(slot, unit);
        }
    }

    fn outputs_fit(&self, primary: ResourceUnit, secondary: Option<ResourceUnit>) -> bool {
        let fits = |slot: Option<usize>, unit: ResourceUnit| {
            slot.is_some_and(|s| self.inventory.can_accept(s, &unit))
        };
        fits(self.layout.output_primary, primary)
            && secondary.is_none_or(|unit| fits(self.layout.output_secondary, unit))
    }

    fn abort(&mut self, recipe: &Recipe, reason: AbortReason) {
        debug!(
            "{} aborted {} at progress {}: {:?}",
            self.spec.name, recipe.name, self.progress, reason
        );
        self.events.push(ConverterEvent::RunAborted {
            recipe: recipe.id,
            reason,
            step: self.steps,
        });
        self.reset_run();
    }

    fn reset_run(&mut self) {
        self.state = ConverterState::Idle;
        self.progress = 0;
        self.active_recipe = None;
        self.pending_outputs = None;
        self.blocked = false;
    }

    // -----------------------------------------------------------------------
    // Generation
    // -----------------------------------------------------------------------

    fn step_generator(&mut self, spec: &GeneratorSpec) {
        let Some(state) = self.generator.as_mut() else {
            return;
        };
        let mut ctx = GeneratorContext {
            pool: &mut self.pool,
            inventory: &mut self.inventory,
            layout: &self.layout,
            events: &mut self.events,
            step: self.steps,
            name: &self.spec.name,
        };
        state.step(spec, &mut ctx);
    }

    // -----------------------------------------------------------------------
    // Observation
    // -----------------------------------------------------------------------

    /// The snapshot taken at the end of the last step (or external change
    /// followed by [`refresh_snapshot`](Self::refresh_snapshot)).
    pub fn snapshot(&self) -> &ConverterSnapshot {
        &self.snapshot
    }

    pub fn refresh_snapshot(&mut self) {
        self.snapshot = ConverterSnapshot::capture(self);
        self.snapshot_revisions = (self.pool.revision(), self.inventory.revision());
    }

    /// Whether an external transfer changed the pool or inventory since the
    /// snapshot was taken.
    pub fn snapshot_is_stale(&self) -> bool {
        self.snapshot_revisions != (self.pool.revision(), self.inventory.revision())
    }

    /// Take the events raised since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<ConverterEvent> {
        self.events.drain()
    }

    pub fn events(&self) -> &EventQueue {
        &self.events
    }

    /// Face-filtered access for neighbours.
    pub fn capabilities(&mut self) -> CapabilityFacade<'_> {
        CapabilityFacade::new(&mut self.pool, &mut self.inventory, self.spec.faces)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn spec(&self) -> &Arc<ConverterSpec> {
        &self.spec
    }

    pub fn layout(&self) -> &SlotLayout {
        &self.layout
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn inventory(&self) -> &SlotInventory {
        &self.inventory
    }

    pub fn state(&self) -> ConverterState {
        self.state
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    pub fn active_recipe_id(&self) -> Option<RecipeId> {
        self.active_recipe
    }

    pub fn active_recipe(&self) -> Option<&Recipe> {
        let id = self.active_recipe?;
        self.spec.catalog()?.get(id)
    }

    pub fn pending_outputs(&self) -> Option<PendingOutputs> {
        self.pending_outputs
    }

    /// Holding a finished run because the outputs are full.
    pub fn is_stalled(&self) -> bool {
        self.state == ConverterState::Complete
    }

    pub fn generator_state(&self) -> Option<&GeneratorState> {
        self.generator.as_ref()
    }

    /// Steps this converter has been advanced.
    pub fn steps(&self) -> Steps {
        self.steps
    }
}
