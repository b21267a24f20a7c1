//! Load-test action kinds
//!
//! Each [`ActionKind`] has one [`ContainerAction`] implementation. The driver
//! resolves the implementation once with [`handler`] and calls it for every
//! container in a thread's partition. Backend errors are logged and counted,
//! never propagated.

use serde_json::Value;
use tracing::{error, trace};

use vaultstress_core::model::{bulk_item_id, parse_attributes};
use vaultstress_core::{ActionKind, Attributes, BackendConfig, CoreError};
use vaultstress_store::{ContainerHandle, ItemOptions, SearchOptions, StorageBackend, StoreError};

/// Decoded action payload
///
/// Attribute kinds take a JSON object of string values; `DeleteAttributes`
/// also accepts a JSON array of names; `SearchItems` takes a query as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionPayload {
    pub raw: String,
    pub attributes: Attributes,
    pub names: Vec<String>,
}

impl ActionPayload {
    pub fn parse(kind: ActionKind, raw: &str) -> Result<Self, CoreError> {
        let mut payload = ActionPayload {
            raw: raw.to_string(),
            ..Default::default()
        };

        match kind {
            ActionKind::SearchItems => {}
            ActionKind::DeleteAttributes if raw.trim_start().starts_with('[') => {
                payload.names = serde_json::from_str(raw)?;
            }
            _ => {
                payload.attributes = parse_attributes(raw)?;
                payload.names = payload.attributes.keys().cloned().collect();
            }
        }
        Ok(payload)
    }

    /// Query text for searches; empty means match everything
    pub fn query(&self) -> &str {
        if self.raw.trim().is_empty() {
            "{}"
        } else {
            &self.raw
        }
    }
}

/// Everything an action needs besides its target container
pub struct ActionContext<'a> {
    pub backend: &'a dyn StorageBackend,
    pub backend_config: &'a BackendConfig,
    pub payload: &'a ActionPayload,
    pub items_per_container: usize,
    /// Value written by add and update actions
    pub value: &'a str,
}

/// The container an action runs against
#[derive(Debug, Clone)]
pub struct ActionTarget {
    /// 1-based global container number
    pub number: usize,
    pub name: String,
    /// Set by the driver for kinds that work on an open container
    pub handle: Option<ContainerHandle>,
}

/// Backend calls made and failed by one action execution
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActionOutcome {
    pub operations: u64,
    pub failures: u64,
}

impl ActionOutcome {
    fn record(&mut self, result: Result<(), StoreError>, what: &str, target: &ActionTarget) {
        self.operations += 1;
        if let Err(e) = result {
            self.failures += 1;
            error!(container = %target.name, error = %e, code = e.code(), "{} failed", what);
        }
    }

    pub fn merge(&mut self, other: ActionOutcome) {
        self.operations += other.operations;
        self.failures += other.failures;
    }
}

/// One operation type executed against a single container
pub trait ContainerAction: Send + Sync {
    fn kind(&self) -> ActionKind;

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome;
}

/// Implementation for `kind`
pub fn handler(kind: ActionKind) -> Box<dyn ContainerAction> {
    match kind {
        ActionKind::AddContainer => Box::new(AddContainer),
        ActionKind::OpenAndCloseContainer => Box::new(OpenAndCloseContainer),
        ActionKind::DeleteContainer => Box::new(DeleteContainer),
        ActionKind::AddItem => Box::new(AddItem),
        ActionKind::GetItem => Box::new(GetItem),
        ActionKind::DeleteItem => Box::new(DeleteItem),
        ActionKind::UpdateItemValue => Box::new(UpdateItemValue),
        ActionKind::AddAttributes => Box::new(AddAttributes),
        ActionKind::UpdateAttributes => Box::new(UpdateAttributes),
        ActionKind::DeleteAttributes => Box::new(DeleteAttributes),
        ActionKind::SearchItems => Box::new(SearchItems),
    }
}

/// Run `op` for every item id of the target; requires an open handle
fn for_each_item<F>(
    ctx: &ActionContext<'_>,
    target: &ActionTarget,
    what: &str,
    mut op: F,
) -> ActionOutcome
where
    F: FnMut(ContainerHandle, &str) -> Result<(), StoreError>,
{
    let mut outcome = ActionOutcome::default();
    let Some(handle) = target.handle else {
        outcome.operations = 1;
        outcome.failures = 1;
        error!(container = %target.name, "{} needs an open container", what);
        return outcome;
    };

    for i in 1..=ctx.items_per_container {
        let id = bulk_item_id(target.number, i);
        let result = op(handle, &id);
        outcome.record(result, what, target);
    }
    trace!(container = %target.name, operations = outcome.operations, "{} done", what);
    outcome
}

pub struct AddContainer;

impl ContainerAction for AddContainer {
    fn kind(&self) -> ActionKind {
        ActionKind::AddContainer
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let cfg = ctx.backend_config;
        let mut outcome = ActionOutcome::default();
        let result = ctx.backend.create_container(
            &target.name,
            &cfg.storage_type,
            &cfg.storage_config,
            &cfg.credentials,
        );
        outcome.record(result, "Create container", target);
        outcome
    }
}

pub struct OpenAndCloseContainer;

impl ContainerAction for OpenAndCloseContainer {
    fn kind(&self) -> ActionKind {
        ActionKind::OpenAndCloseContainer
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let mut outcome = ActionOutcome::default();
        match ctx
            .backend
            .open_container(&target.name, &ctx.backend_config.credentials)
        {
            Ok(handle) => {
                outcome.record(Ok(()), "Open container", target);
                let result = ctx.backend.close_container(handle);
                outcome.record(result, "Close container", target);
            }
            Err(e) => outcome.record(Err(e), "Open container", target),
        }
        outcome
    }
}

pub struct DeleteContainer;

impl ContainerAction for DeleteContainer {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteContainer
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let mut outcome = ActionOutcome::default();
        let result = ctx
            .backend
            .delete_container(&target.name, &ctx.backend_config.credentials);
        outcome.record(result, "Delete container", target);
        outcome
    }
}

pub struct AddItem;

impl ContainerAction for AddItem {
    fn kind(&self) -> ActionKind {
        ActionKind::AddItem
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Add item", |handle, id| {
            ctx.backend
                .add_item(handle, item_type, id, ctx.value, &ctx.payload.attributes)
        })
    }
}

pub struct GetItem;

impl ContainerAction for GetItem {
    fn kind(&self) -> ActionKind {
        ActionKind::GetItem
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        let options = ItemOptions::all();
        for_each_item(ctx, target, "Get item", |handle, id| {
            match ctx.backend.get_item(handle, item_type, id, &options)? {
                Value::Null => Err(StoreError::ItemNotFound {
                    item_type: item_type.clone(),
                    id: id.to_string(),
                }),
                _ => Ok(()),
            }
        })
    }
}

pub struct DeleteItem;

impl ContainerAction for DeleteItem {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteItem
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Delete item", |handle, id| {
            ctx.backend.delete_item(handle, item_type, id)
        })
    }
}

pub struct UpdateItemValue;

impl ContainerAction for UpdateItemValue {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateItemValue
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Update item value", |handle, id| {
            ctx.backend.update_item_value(handle, item_type, id, ctx.value)
        })
    }
}

pub struct AddAttributes;

impl ContainerAction for AddAttributes {
    fn kind(&self) -> ActionKind {
        ActionKind::AddAttributes
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Add attributes", |handle, id| {
            ctx.backend
                .add_attributes(handle, item_type, id, &ctx.payload.attributes)
        })
    }
}

pub struct UpdateAttributes;

impl ContainerAction for UpdateAttributes {
    fn kind(&self) -> ActionKind {
        ActionKind::UpdateAttributes
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Update attributes", |handle, id| {
            ctx.backend
                .update_attributes(handle, item_type, id, &ctx.payload.attributes)
        })
    }
}

pub struct DeleteAttributes;

impl ContainerAction for DeleteAttributes {
    fn kind(&self) -> ActionKind {
        ActionKind::DeleteAttributes
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let item_type = &ctx.backend_config.item_type;
        for_each_item(ctx, target, "Delete attributes", |handle, id| {
            ctx.backend
                .delete_attributes(handle, item_type, id, &ctx.payload.names)
        })
    }
}

/// One search per container, reading back a single page
pub struct SearchItems;

impl ContainerAction for SearchItems {
    fn kind(&self) -> ActionKind {
        ActionKind::SearchItems
    }

    fn execute(&self, ctx: &ActionContext<'_>, target: &ActionTarget) -> ActionOutcome {
        let mut outcome = ActionOutcome::default();
        let Some(handle) = target.handle else {
            outcome.record(
                Err(StoreError::InvalidHandle(-1)),
                "Search",
                target,
            );
            return outcome;
        };

        let backend = ctx.backend;
        let search = match backend.open_search(
            handle,
            &ctx.backend_config.item_type,
            ctx.payload.query(),
            &SearchOptions::all(),
        ) {
            Ok(search) => search,
            Err(e) => {
                outcome.record(Err(e), "Open search", target);
                return outcome;
            }
        };
        outcome.record(Ok(()), "Open search", target);

        let page_size = ctx.items_per_container.max(1);
        let fetched = backend.fetch_next_results(search, page_size).map(|_| ());
        outcome.record(fetched, "Fetch search results", target);
        outcome.record(backend.close_search(search), "Close search", target);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vaultstress_store::MemoryBackend;

    struct Fixture {
        backend: MemoryBackend,
        config: BackendConfig,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                backend: MemoryBackend::new(),
                config: BackendConfig::default(),
            }
        }

        fn run(
            &self,
            kind: ActionKind,
            payload: &str,
            items: usize,
            number: usize,
        ) -> ActionOutcome {
            let payload = ActionPayload::parse(kind, payload).unwrap();
            let ctx = ActionContext {
                backend: &self.backend,
                backend_config: &self.config,
                payload: &payload,
                items_per_container: items,
                value: "value",
            };
            let name = format!("wallet_{}", number);
            let handle = if kind.works_on_open_container() {
                Some(self.backend.open_container(&name, "{}").unwrap())
            } else {
                None
            };
            let target = ActionTarget {
                number,
                name,
                handle,
            };
            let outcome = handler(kind).execute(&ctx, &target);
            if let Some(handle) = handle {
                self.backend.close_container(handle).unwrap();
            }
            outcome
        }
    }

    #[test]
    fn test_handler_matches_kind() {
        for kind in ActionKind::ALL {
            assert_eq!(handler(kind).kind(), kind);
        }
    }

    #[test]
    fn test_payload_parsing() {
        let payload =
            ActionPayload::parse(ActionKind::AddAttributes, r#"{"name": "John"}"#).unwrap();
        assert_eq!(payload.attributes["name"], "John");
        assert_eq!(payload.names, vec!["name".to_string()]);

        let payload =
            ActionPayload::parse(ActionKind::DeleteAttributes, r#"["a", "b"]"#).unwrap();
        assert_eq!(payload.names, vec!["a".to_string(), "b".to_string()]);

        let payload = ActionPayload::parse(ActionKind::SearchItems, "").unwrap();
        assert_eq!(payload.query(), "{}");

        assert!(ActionPayload::parse(ActionKind::AddItem, "{not json").is_err());
    }

    #[test]
    fn test_container_lifecycle_actions() {
        let fx = Fixture::new();

        let outcome = fx.run(ActionKind::AddContainer, "", 0, 1);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 1,
                failures: 0,
            }
        );
        assert!(fx.backend.contains_container("wallet_1"));

        let outcome = fx.run(ActionKind::OpenAndCloseContainer, "", 0, 1);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 2,
                failures: 0,
            }
        );

        let outcome = fx.run(ActionKind::DeleteContainer, "", 0, 1);
        assert_eq!(outcome.failures, 0);
        assert!(!fx.backend.contains_container("wallet_1"));

        // Deleting again counts as a failure but does not panic
        let outcome = fx.run(ActionKind::DeleteContainer, "", 0, 1);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 1,
                failures: 1,
            }
        );
    }

    #[test]
    fn test_item_actions() {
        let fx = Fixture::new();
        fx.run(ActionKind::AddContainer, "", 0, 3);

        let outcome = fx.run(ActionKind::AddItem, r#"{"k": "v"}"#, 5, 3);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 5,
                failures: 0,
            }
        );
        assert_eq!(fx.backend.item_count("wallet_3"), Some(5));

        assert_eq!(fx.run(ActionKind::GetItem, "", 5, 3).failures, 0);
        assert_eq!(fx.run(ActionKind::UpdateItemValue, "", 5, 3).failures, 0);

        fx.run(ActionKind::UpdateAttributes, r#"{"k": "w"}"#, 5, 3);
        fx.run(ActionKind::AddAttributes, r#"{"extra": "x"}"#, 5, 3);
        let attrs = fx
            .backend
            .item_attributes("wallet_3", "TestType", "item_3_2")
            .unwrap();
        assert_eq!(attrs["k"], "w");
        assert_eq!(attrs["extra"], "x");

        fx.run(ActionKind::DeleteAttributes, r#"["extra"]"#, 5, 3);
        let attrs = fx
            .backend
            .item_attributes("wallet_3", "TestType", "item_3_2")
            .unwrap();
        assert!(!attrs.contains_key("extra"));

        let outcome = fx.run(ActionKind::SearchItems, r#"{"k": "w"}"#, 5, 3);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 3,
                failures: 0,
            }
        );

        assert_eq!(fx.run(ActionKind::DeleteItem, "", 5, 3).failures, 0);
        assert_eq!(fx.backend.item_count("wallet_3"), Some(0));

        // Items are gone now
        assert_eq!(fx.run(ActionKind::GetItem, "", 5, 3).failures, 5);
    }

    #[test]
    fn test_item_action_without_handle_fails() {
        let backend = MemoryBackend::new();
        let config = BackendConfig::default();
        let payload = ActionPayload::default();
        let ctx = ActionContext {
            backend: &backend,
            backend_config: &config,
            payload: &payload,
            items_per_container: 3,
            value: "v",
        };
        let target = ActionTarget {
            number: 1,
            name: "wallet_1".to_string(),
            handle: None,
        };
        let outcome = AddItem.execute(&ctx, &target);
        assert_eq!(
            outcome,
            ActionOutcome {
                operations: 1,
                failures: 1,
            }
        );
    }
}
