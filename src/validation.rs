//! Input validation for repair scheduling.
//!
//! Checks structural integrity of the item catalog and the fixed
//! placements before seeding. Detects:
//! - Duplicate item ids (across movable and fixed items)
//! - Requirements on unknown items
//! - Items requiring themselves
//! - Circular requirements (DAG validation)
//!
//! Every issue is reported at once rather than stopping at the first.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::models::{Item, ItemId, ScheduledItem};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two items share the same id.
    DuplicateId,
    /// An item requires an id that is neither scheduled nor fixed.
    UnknownRequirement,
    /// An item requires itself.
    SelfRequirement,
    /// The requirement graph contains a cycle.
    CyclicRequirement,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Validates the items to schedule together with the fixed placements.
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_input(items: &[Item], fixed: &[ScheduledItem]) -> ValidationResult {
    let mut errors = Vec::new();

    let all: Vec<&Item> = fixed
        .iter()
        .map(ScheduledItem::item)
        .chain(items.iter())
        .collect();

    let mut ids = BTreeSet::new();
    for item in &all {
        if !ids.insert(item.id()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate item ID: {}", item.id()),
            ));
        }
    }

    for item in &all {
        for &required in item.required() {
            if required == item.id() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::SelfRequirement,
                    format!("Item {} requires itself", item.id()),
                ));
            } else if !ids.contains(&required) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownRequirement,
                    format!("Item {} requires unknown item {required}", item.id()),
                ));
            }
        }
    }

    if let Some(cycle_err) = detect_cycles(&all) {
        errors.push(cycle_err);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the requirement graph using DFS.
///
/// Self-requirements are reported separately and ignored here.
fn detect_cycles(items: &[&Item]) -> Option<ValidationError> {
    // required → dependents
    let mut adj: BTreeMap<ItemId, Vec<ItemId>> = BTreeMap::new();
    for item in items {
        for &required in item.required() {
            if required != item.id() {
                adj.entry(required).or_default().push(item.id());
            }
        }
    }

    let mut visited = BTreeSet::new();
    let mut in_stack = BTreeSet::new();

    for item in items {
        let node = item.id();
        if !visited.contains(&node) && has_cycle_dfs(node, &adj, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicRequirement,
                format!("Circular requirement detected involving item {node}"),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    node: ItemId,
    adj: &BTreeMap<ItemId, Vec<ItemId>>,
    visited: &mut BTreeSet<ItemId>,
    in_stack: &mut BTreeSet<ItemId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true;
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Lane;

    fn item(id: ItemId) -> Item {
        Item::on_lane(id, Lane::new(0), 100).unwrap()
    }

    #[test]
    fn test_valid_input() {
        let items = vec![item(1), item(2).with_required(1), item(3).with_required(10)];
        let fixed = vec![ScheduledItem::new(item(10), 0)];
        assert!(validate_input(&items, &fixed).is_ok());
    }

    #[test]
    fn test_duplicate_across_fixed_and_movable() {
        let items = vec![item(1), item(2)];
        let fixed = vec![ScheduledItem::new(item(2), 0)];

        let errors = validate_input(&items, &fixed).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::DuplicateId);
        assert!(errors[0].to_string().contains('2'));
    }

    #[test]
    fn test_unknown_requirement() {
        let items = vec![item(1).with_required(99)];
        let errors = validate_input(&items, &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownRequirement));
    }

    #[test]
    fn test_self_requirement() {
        let items = vec![item(1).with_required(1)];
        let errors = validate_input(&items, &[]).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::SelfRequirement);
    }

    #[test]
    fn test_cyclic_requirement() {
        // 1 → 2 → 3 → 1
        let items = vec![
            item(1).with_required(3),
            item(2).with_required(1),
            item(3).with_required(2),
        ];
        let errors = validate_input(&items, &[]).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::CyclicRequirement));
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let items = vec![item(1), item(2).with_required(1), item(3).with_required(2)];
        assert!(validate_input(&items, &[]).is_ok());
    }

    #[test]
    fn test_multiple_errors() {
        let items = vec![item(1).with_required(1), item(1), item(2).with_required(7)];
        let errors = validate_input(&items, &[]).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
