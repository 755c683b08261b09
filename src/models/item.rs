//! Item model.
//!
//! An item is an indivisible unit of work. It occupies every lane in its
//! duration profile simultaneously, starting at the same offset, for the
//! lane-specific duration.
//!
//! # Domain Mappings
//!
//! | u-repair | Manufacturing | Healthcare | Logistics |
//! |----------|--------------|------------|-----------|
//! | Item | Operation | Procedure | Transport Leg |
//! | Lane | Machine/Worker | Room/Doctor | Truck/Driver |

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Lane;
use crate::error::{InvalidItemReason, ScheduleError};

/// Item identifier. Unique within one scheduling run.
pub type ItemId = u32;

/// A unit of work with per-lane durations and required predecessors.
///
/// Immutable after construction. Durations are validated once in
/// [`Item::new`]; every item occupies at least one lane and every
/// duration is positive.
///
/// # Examples
///
/// ```
/// use u_repair::models::{Item, Lane};
///
/// let weld = Item::new(1, [(Lane::new(0), 100), (Lane::new(1), 40)]).unwrap();
/// let paint = Item::new(2, [(Lane::new(0), 60)]).unwrap().with_required(1);
///
/// assert_eq!(weld.max_duration(), 100);
/// assert_eq!(weld.duration_summary(), 140);
/// assert!(paint.requires(1));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "ItemSpec", into = "ItemSpec")]
pub struct Item {
    id: ItemId,
    durations: BTreeMap<Lane, i64>,
    required: Vec<ItemId>,
    max_duration: i64,
    duration_summary: i64,
}

/// Wire form of an [`Item`]; validated on the way in.
#[derive(Serialize, Deserialize)]
struct ItemSpec {
    id: ItemId,
    durations: BTreeMap<Lane, i64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    required: Vec<ItemId>,
}

impl Item {
    /// Creates an item from its lane → duration profile.
    ///
    /// # Errors
    /// [`ScheduleError::InvalidItem`] if the profile is empty or any
    /// duration is not positive.
    pub fn new(
        id: ItemId,
        durations: impl IntoIterator<Item = (Lane, i64)>,
    ) -> Result<Self, ScheduleError> {
        let durations: BTreeMap<Lane, i64> = durations.into_iter().collect();
        if durations.is_empty() {
            return Err(ScheduleError::InvalidItem {
                id,
                reason: InvalidItemReason::NoLanes,
            });
        }
        if let Some((&lane, &duration)) = durations.iter().find(|(_, &d)| d <= 0) {
            return Err(ScheduleError::InvalidItem {
                id,
                reason: InvalidItemReason::NonPositiveDuration { lane, duration },
            });
        }

        let max_duration = durations.values().copied().max().unwrap_or(0);
        let duration_summary = durations.values().sum();

        Ok(Self {
            id,
            durations,
            required: Vec::new(),
            max_duration,
            duration_summary,
        })
    }

    /// Creates an item occupying a single lane.
    pub fn on_lane(id: ItemId, lane: Lane, duration: i64) -> Result<Self, ScheduleError> {
        Self::new(id, [(lane, duration)])
    }

    /// Adds a required item (this item must follow it).
    pub fn with_required(mut self, required: ItemId) -> Self {
        if !self.required.contains(&required) {
            self.required.push(required);
        }
        self
    }

    /// Adds several required items, in order.
    pub fn with_requirements(mut self, required: impl IntoIterator<Item = ItemId>) -> Self {
        for id in required {
            self = self.with_required(id);
        }
        self
    }

    #[inline]
    pub fn id(&self) -> ItemId {
        self.id
    }

    /// Lane → duration profile.
    pub fn durations(&self) -> &BTreeMap<Lane, i64> {
        &self.durations
    }

    /// Duration on `lane`, if the item occupies it.
    #[inline]
    pub fn duration(&self, lane: Lane) -> Option<i64> {
        self.durations.get(&lane).copied()
    }

    /// Lanes occupied, in ascending lane order.
    pub fn lanes(&self) -> impl Iterator<Item = Lane> + '_ {
        self.durations.keys().copied()
    }

    /// Longest lane duration.
    #[inline]
    pub fn max_duration(&self) -> i64 {
        self.max_duration
    }

    /// Sum of all lane durations.
    #[inline]
    pub fn duration_summary(&self) -> i64 {
        self.duration_summary
    }

    /// Items this item structurally requires, in declaration order.
    pub fn required(&self) -> &[ItemId] {
        &self.required
    }

    /// Whether this item requires `other`.
    #[inline]
    pub fn requires(&self, other: ItemId) -> bool {
        self.required.contains(&other)
    }

    /// Whether both items occupy at least one common lane.
    pub fn shares_lane(&self, other: &Item) -> bool {
        self.durations.keys().any(|lane| other.durations.contains_key(lane))
    }

    /// Common lanes with both durations: `(lane, self, other)`.
    pub fn shared_lanes<'a>(
        &'a self,
        other: &'a Item,
    ) -> impl Iterator<Item = (Lane, i64, i64)> + 'a {
        self.durations
            .iter()
            .filter_map(|(&lane, &mine)| other.duration(lane).map(|theirs| (lane, mine, theirs)))
    }
}

impl TryFrom<ItemSpec> for Item {
    type Error = ScheduleError;

    fn try_from(spec: ItemSpec) -> Result<Self, Self::Error> {
        Ok(Item::new(spec.id, spec.durations)?.with_requirements(spec.required))
    }
}

impl From<Item> for ItemSpec {
    fn from(item: Item) -> Self {
        Self {
            id: item.id,
            durations: item.durations,
            required: item.required,
        }
    }
}
