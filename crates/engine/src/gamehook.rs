//! The public `GameHook` facade (§6): the one type a front end embeds or an
//! edge server wraps. Ties the driver, memory manager, mapper, update loop,
//! and event bus together behind a small, synchronous-feeling async API.

use crate::bus::{EventBus, Filter};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::tick::{self, EngineContext};
use driver::Driver;
use mapper::Mapper;
use memory::Memory;
use shared::{ChangeEvent, PropertyValue};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct MapperSummary {
    pub name: String,
    pub game: String,
    pub version: Option<String>,
}

struct LoadedMapper {
    mapper: Arc<Mapper>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// Every method takes `&self`: the facade is cheap to clone-share (it is
/// itself just `Arc`-backed state behind a lock) and safe to call from many
/// tasks at once — concurrent reads never block each other, and a
/// `LoadMapper` only blocks other calls for the instant it takes to swap the
/// pointer (§5 "Concurrency model").
pub struct GameHook {
    ctx: Arc<EngineContext>,
    mappers_dir: PathBuf,
    interval: Duration,
    loaded: RwLock<Option<LoadedMapper>>,
}

impl GameHook {
    pub fn new(config: EngineConfig) -> Self {
        let ctx = Arc::new(EngineContext {
            driver: Driver::new(config.driver),
            memory: Arc::new(Memory::new()),
            bus: Arc::new(EventBus::new(config.event_buffer)),
        });
        Self {
            ctx,
            mappers_dir: config.mappers_dir,
            interval: config.update_interval,
            loaded: RwLock::new(None),
        }
    }

    /// Lists the `.json` mapper documents available in the configured
    /// mappers directory, without loading any of them (§6).
    pub async fn list_mappers(&self) -> Result<Vec<String>, EngineError> {
        let mut entries = tokio::fs::read_dir(&self.mappers_dir).await?;
        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    names.push(stem.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Loads `name.json` from the mappers directory, validates it, and
    /// atomically swaps it in: the previous update loop (if any) is
    /// cancelled and allowed to finish its in-flight tick before the new one
    /// starts (§5 "Mapper swap"). A load failure leaves the previously
    /// installed mapper, if any, running untouched.
    pub async fn load_mapper(&self, name: &str) -> Result<(), EngineError> {
        let path = self.mappers_dir.join(format!("{name}.json"));
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|_| EngineError::MapperUnknown(name.to_string()))?;
        let mapper = Arc::new(mapper::load_mapper(&text)?);

        let mut guard = self.loaded.write().await;
        if let Some(previous) = guard.take() {
            previous.cancel.cancel();
            let _ = previous.handle.await;
        }
        self.ctx.memory.reset_property_state().await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(tick::run(
            self.ctx.clone(),
            mapper.clone(),
            self.interval,
            cancel.clone(),
        ));
        *guard = Some(LoadedMapper {
            mapper,
            cancel,
            handle,
        });
        Ok(())
    }

    pub async fn current_mapper(&self) -> Option<MapperSummary> {
        let guard = self.loaded.read().await;
        guard.as_ref().map(|loaded| MapperSummary {
            name: loaded.mapper.name.clone(),
            game: loaded.mapper.game.clone(),
            version: loaded.mapper.version.clone(),
        })
    }

    async fn current(&self) -> Result<Arc<Mapper>, EngineError> {
        let guard = self.loaded.read().await;
        guard
            .as_ref()
            .map(|loaded| loaded.mapper.clone())
            .ok_or(EngineError::MapperNotLoaded)
    }

    pub async fn get_property(&self, name: &str) -> Result<PropertyValue, EngineError> {
        let mapper = self.current().await?;
        mapper
            .property(name)
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))?;
        self.ctx
            .memory
            .last_value(name)
            .await
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))
    }

    /// `SetProperty(name, value)` (§6). Unlike the passive decode pipeline,
    /// which degrades silently on a soft failure, a direct write rejects an
    /// invalid value outright — the caller asked for this specific write and
    /// deserves to know it didn't happen.
    pub async fn set_property(&self, name: &str, value: PropertyValue) -> Result<(), EngineError> {
        let mapper = self.current().await?;
        let property = mapper
            .property(name)
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))?;
        if property.is_computed() {
            return Err(EngineError::PropertyComputed(name.to_string()));
        }
        if property.read_only {
            return Err(EngineError::PropertyReadOnly(name.to_string()));
        }
        if let Some(validation) = &property.validation {
            let warnings = mapper::validate::check(validation, &value);
            if !warnings.is_empty() {
                let message = warnings
                    .into_iter()
                    .map(|w| w.message)
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(EngineError::Validation(message));
            }
        }
        let addr = property
            .address
            .expect("non-computed properties always carry an address (enforced at load)");
        let endian = mapper.endian_for(property);
        let bytes = mapper::encode_property_type(property.property_type, &value, property.length, endian)
            .map_err(|err| EngineError::Validation(err.to_string()))?;
        let freezable = property.freezable;

        self.ctx.driver.write_bytes(addr, &bytes).await?;
        if self.ctx.memory.is_frozen(addr).await {
            self.ctx
                .memory
                .freeze_property(addr, bytes, freezable)
                .await
                .map_err(|err| EngineError::Validation(err.to_string()))?;
        }
        Ok(())
    }

    /// `FreezeProperty(name)` (§6): freezes at the property's current raw
    /// bytes, as last decoded by the update loop.
    pub async fn freeze_property(&self, name: &str) -> Result<(), EngineError> {
        let mapper = self.current().await?;
        let property = mapper
            .property(name)
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))?;
        let addr = property
            .address
            .ok_or_else(|| EngineError::PropertyComputed(name.to_string()))?;
        let state = self
            .ctx
            .memory
            .property_state(name)
            .await
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))?;
        self.ctx
            .memory
            .freeze_property(addr, state.raw_bytes, property.freezable)
            .await
            .map_err(|err| EngineError::Validation(err.to_string()))
    }

    pub async fn unfreeze_property(&self, name: &str) -> Result<(), EngineError> {
        let mapper = self.current().await?;
        let property = mapper
            .property(name)
            .ok_or_else(|| EngineError::PropertyUnknown(name.to_string()))?;
        let addr = property
            .address
            .ok_or_else(|| EngineError::PropertyComputed(name.to_string()))?;
        self.ctx.memory.unfreeze_property(addr).await;
        Ok(())
    }

    /// `SubscribeChanges(property?)` (§4.5): `None` subscribes to every
    /// property, `Some(name)` to just that one.
    pub async fn subscribe_changes(&self, property: Option<&str>) -> mpsc::Receiver<ChangeEvent> {
        let filter = match property {
            Some(name) => Filter::Named(name.to_string()),
            None => Filter::All,
        };
        self.ctx.bus.subscribe(filter).await
    }

    /// Cancels the running update loop, if any, and waits for its current
    /// tick to finish (§5 "Shutdown").
    pub async fn shutdown(&self) {
        let mut guard = self.loaded.write().await;
        if let Some(loaded) = guard.take() {
            loaded.cancel.cancel();
            let _ = loaded.handle.await;
        }
    }
}

