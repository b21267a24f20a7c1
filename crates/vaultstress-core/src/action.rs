//! Operation kinds the load driver can run in bulk

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::CoreError;

/// One fixed operation type, executed against every container of a partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    AddContainer,
    OpenAndCloseContainer,
    DeleteContainer,
    AddItem,
    GetItem,
    DeleteItem,
    UpdateItemValue,
    AddAttributes,
    UpdateAttributes,
    DeleteAttributes,
    SearchItems,
}

impl ActionKind {
    /// Every kind, in declaration order
    pub const ALL: [ActionKind; 11] = [
        ActionKind::AddContainer,
        ActionKind::OpenAndCloseContainer,
        ActionKind::DeleteContainer,
        ActionKind::AddItem,
        ActionKind::GetItem,
        ActionKind::DeleteItem,
        ActionKind::UpdateItemValue,
        ActionKind::AddAttributes,
        ActionKind::UpdateAttributes,
        ActionKind::DeleteAttributes,
        ActionKind::SearchItems,
    ];

    /// Snake-case name used in config files and on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::AddContainer => "add_container",
            ActionKind::OpenAndCloseContainer => "open_and_close_container",
            ActionKind::DeleteContainer => "delete_container",
            ActionKind::AddItem => "add_item",
            ActionKind::GetItem => "get_item",
            ActionKind::DeleteItem => "delete_item",
            ActionKind::UpdateItemValue => "update_item_value",
            ActionKind::AddAttributes => "add_attributes",
            ActionKind::UpdateAttributes => "update_attributes",
            ActionKind::DeleteAttributes => "delete_attributes",
            ActionKind::SearchItems => "search_items",
        }
    }

    /// Whether the driver opens the container before timing the action
    pub fn works_on_open_container(&self) -> bool {
        !matches!(
            self,
            ActionKind::AddContainer
                | ActionKind::OpenAndCloseContainer
                | ActionKind::DeleteContainer
        )
    }

    /// Whether the action expects containers to exist beforehand
    pub fn needs_existing_containers(&self) -> bool {
        !matches!(self, ActionKind::AddContainer)
    }

    /// Whether the action expects items to exist beforehand
    pub fn needs_existing_items(&self) -> bool {
        matches!(
            self,
            ActionKind::GetItem
                | ActionKind::DeleteItem
                | ActionKind::UpdateItemValue
                | ActionKind::AddAttributes
                | ActionKind::UpdateAttributes
                | ActionKind::DeleteAttributes
                | ActionKind::SearchItems
        )
    }
}

impl std::fmt::Display for ActionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        ActionKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| CoreError::Config(format!("unknown action: {}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(kind.as_str().parse::<ActionKind>().unwrap(), kind);
        }
        assert_eq!(
            "Update-Item-Value".parse::<ActionKind>().unwrap(),
            ActionKind::UpdateItemValue
        );
        assert!("explode".parse::<ActionKind>().is_err());
    }

    #[test]
    fn test_serde_name_matches_display() {
        let json = serde_json::to_string(&ActionKind::SearchItems).unwrap();
        assert_eq!(json, "\"search_items\"");
    }

    #[test]
    fn test_container_level_kinds() {
        assert!(!ActionKind::AddContainer.works_on_open_container());
        assert!(!ActionKind::AddContainer.needs_existing_containers());
        assert!(ActionKind::GetItem.works_on_open_container());
        assert!(ActionKind::GetItem.needs_existing_items());
        assert!(!ActionKind::AddItem.needs_existing_items());
    }
}
