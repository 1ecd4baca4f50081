//! Run command implementation.

use crate::script::{self, Op, ScriptResult, Step};
use entistate_core::{
    ActiveMode, ActiveTarget, AddOptions, EntityAction, EntityState, EntityStore, Patch, Record,
    RecordId, StatsSnapshot, StoreConfig, Subscription, Target, TransactionCoordinator,
};
use entistate_plugins::{EntityStateHistoryPlugin, HistoryConfig};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::debug;

/// Collection settings for a replay.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Field holding record ids.
    pub id_key: String,
    /// Allow several active ids.
    pub multi: bool,
    /// Undo steps kept per entity.
    pub max_age: usize,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            id_key: "id".to_string(),
            multi: false,
            max_age: 10,
        }
    }
}

/// A notification observed by the replay subscriber.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationInfo {
    /// Ids in collection order.
    pub ids: Vec<RecordId>,
    /// Active ids.
    pub active: Vec<RecordId>,
}

/// Outcome of one top-level operation.
#[derive(Debug, Serialize)]
pub struct StepReport {
    /// Position in the script.
    pub index: usize,
    /// Operation tag.
    pub op: &'static str,
    /// Notifications delivered while the operation ran.
    pub notifications: Vec<NotificationInfo>,
    /// Entity actions emitted while the operation ran.
    pub actions: Vec<EntityAction<RecordId>>,
}

/// Collection contents after the replay.
#[derive(Debug, Serialize)]
pub struct FinalState {
    /// Ids in collection order.
    pub ids: Vec<RecordId>,
    /// Records in collection order.
    pub entities: Vec<Record>,
    /// Active ids.
    pub active: Vec<RecordId>,
    /// Loading flag.
    pub loading: bool,
    /// Error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Full replay report.
#[derive(Debug, Serialize)]
pub struct ReplayReport {
    /// Per-operation results.
    pub steps: Vec<StepReport>,
    /// Final contents.
    pub state: FinalState,
    /// Operation counters.
    pub stats: StatsSnapshot,
}

/// Replays scripted operations against a record collection with undo
/// history attached to every entity.
pub struct Replay {
    store: Arc<EntityStore<Record>>,
    history: EntityStateHistoryPlugin<Record>,
    notifications: Arc<Mutex<Vec<NotificationInfo>>>,
    actions: Receiver<EntityAction<RecordId>>,
    _subscription: Subscription,
}

impl Replay {
    /// Creates a replay over an empty collection.
    pub fn new(options: &RunOptions) -> Self {
        let mode = if options.multi {
            ActiveMode::Multi
        } else {
            ActiveMode::Single
        };
        let config = StoreConfig::new()
            .name("replay")
            .id_key(options.id_key.clone())
            .active_mode(mode)
            .coordinator(Arc::new(TransactionCoordinator::new()));
        let store = Arc::new(EntityStore::<Record>::new(config));

        let notifications = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&notifications);
        let subscription = store
            .store()
            .subscribe(move |state: &EntityState<Record>| {
                sink.lock().push(NotificationInfo {
                    ids: state.ids.clone(),
                    active: state.active.ids(),
                });
            });
        let actions = store.actions().subscribe();
        let history = EntityStateHistoryPlugin::new(
            Arc::clone(&store),
            HistoryConfig::new().max_age(options.max_age),
        );

        Self {
            store,
            history,
            notifications,
            actions,
            _subscription: subscription,
        }
    }

    /// Returns the collection.
    pub fn store(&self) -> &Arc<EntityStore<Record>> {
        &self.store
    }

    /// Runs one top-level operation and reports what it produced.
    pub fn step(&self, index: usize, op: &Op) -> ScriptResult<StepReport> {
        debug!(index, op = op.name(), "replay step");
        self.execute(op)?;
        Ok(StepReport {
            index,
            op: op.name(),
            notifications: std::mem::take(&mut *self.notifications.lock()),
            actions: self.actions.try_iter().collect(),
        })
    }

    /// Runs every operation, stopping at the first failure.
    pub fn run_all(&self, ops: &[Op]) -> ScriptResult<Vec<StepReport>> {
        ops.iter()
            .enumerate()
            .map(|(index, op)| self.step(index, op))
            .collect()
    }

    /// Returns the current contents.
    pub fn final_state(&self) -> FinalState {
        let state = self.store.store().value();
        FinalState {
            ids: state.ids.clone(),
            entities: state.iter().cloned().collect(),
            active: state.active.ids(),
            loading: state.loading,
            error: state.error.clone(),
        }
    }

    fn execute(&self, op: &Op) -> ScriptResult<()> {
        match op {
            Op::Set { records } => self.store.set(script::records("set", records)?)?,
            Op::Add { records, prepend } => {
                let options = AddOptions {
                    prepend: *prepend,
                    ..AddOptions::default()
                };
                self.store
                    .add_with(script::records("add", records)?, options)?;
            }
            Op::Update { ids, patch } => {
                let patch = script::patch("update", patch)?;
                self.store.update(target(ids.as_deref())?, Patch::merge(patch))?;
            }
            Op::Upsert { ids, patch } => {
                let patch = script::patch("upsert", patch)?;
                self.store.upsert(script::ids(ids)?, Patch::merge(patch))?;
            }
            Op::UpsertMany { records } => {
                self.store
                    .upsert_many(script::records("upsert_many", records)?)?;
            }
            Op::Remove { ids } => self.store.remove(target(ids.as_deref())?)?,
            Op::SetActive { id, step } => {
                let target = match (id, step) {
                    (Some(id), _) => ActiveTarget::Id(script::id(id)?),
                    (None, Some(Step::Next)) => ActiveTarget::next(),
                    (None, Some(Step::Prev)) => ActiveTarget::prev(),
                    (None, Some(Step::Clear) | None) => ActiveTarget::Clear,
                };
                self.store.set_active(target)?;
            }
            Op::ToggleActive { ids } => self.store.toggle_active(script::ids(ids)?)?,
            Op::Undo { id } => self.history.undo(&script::id(id)?)?,
            Op::Redo { id } => self.history.redo(&script::id(id)?)?,
            Op::Transaction { ops } => {
                self.store
                    .batch(|_| ops.iter().try_for_each(|op| self.execute(op)))?;
            }
        }
        Ok(())
    }
}

fn target(ids: Option<&[serde_json::Value]>) -> ScriptResult<Target<Record>> {
    Ok(match ids {
        Some(ids) => Target::Ids(script::ids(ids)?),
        None => Target::All,
    })
}

/// Runs the run command.
pub fn run(path: &Path, options: &RunOptions, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let ops = script::load(path)?;
    let replay = Replay::new(options);
    let steps = replay.run_all(&ops)?;
    let report = ReplayReport {
        steps,
        state: replay.final_state(),
        stats: replay.store().stats().snapshot(),
    };

    match format {
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        _ => {
            print_text_output(&report);
        }
    }

    Ok(())
}

fn print_text_output(report: &ReplayReport) {
    for step in &report.steps {
        println!("[{}] {}", step.index, step.op);
        for action in &step.actions {
            match &action.previous {
                Some(previous) => println!(
                    "  action #{} {:?}: {} -> {}",
                    action.sequence.as_u64(),
                    action.kind,
                    previous,
                    join(&action.ids)
                ),
                None => println!(
                    "  action #{} {:?}: [{}]",
                    action.sequence.as_u64(),
                    action.kind,
                    join(&action.ids)
                ),
            }
        }
        for notification in &step.notifications {
            println!(
                "  notify ids=[{}] active=[{}]",
                join(&notification.ids),
                join(&notification.active)
            );
        }
    }

    println!();
    println!("Final State");
    println!("===========");
    println!("Entities: {}", report.state.ids.len());
    for entity in &report.state.entities {
        println!("  {}", serde_json::Value::Object(entity.as_map().clone()));
    }
    println!("Active: [{}]", join(&report.state.active));
    if let Some(error) = &report.state.error {
        println!("Error: {error}");
    }

    let stats = &report.stats;
    println!();
    println!("Statistics");
    println!("==========");
    println!("  Sets: {}", stats.sets);
    println!("  Adds: {}", stats.adds);
    println!("  Updates: {}", stats.updates);
    println!("  Upserts: {}", stats.upserts);
    println!("  Removes: {}", stats.removes);
    println!("  Active changes: {}", stats.active_changes);
    println!("  Notifications: {}", stats.notifications);
    println!("  Deferred: {}", stats.deferred);
    println!("  Skipped records: {}", stats.skipped_records);
}

fn join(ids: &[RecordId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
