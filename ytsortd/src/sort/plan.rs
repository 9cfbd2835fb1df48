use std::cmp::Ordering;

use super::collection::{Collection, Item};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn from_reverse(reverse: bool) -> Self {
        if reverse {
            Self::Descending
        } else {
            Self::Ascending
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("playlist of {0} items exceeds the addressable position range")]
pub struct PlanError(pub usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub item: Item,
    pub target: u32,
}

impl PlanEntry {
    pub fn is_noop(&self) -> bool {
        self.item.position == self.target
    }
}

/// Items in their desired order, each paired with its target position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PositionPlan {
    entries: Vec<PlanEntry>,
}

impl PositionPlan {
    pub fn entries(&self) -> &[PlanEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries whose item is not already at its target.
    pub fn moves(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|entry| !entry.is_noop())
    }
}

impl IntoIterator for PositionPlan {
    type Item = PlanEntry;
    type IntoIter = std::vec::IntoIter<PlanEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Orders the collection by duration and assigns rank `i` to target `i`.
///
/// Equal durations keep their current relative order (by position, then by
/// video id) in both directions, so an already sorted playlist plans no moves.
pub fn plan_positions(
    collection: Collection,
    direction: SortDirection,
) -> Result<PositionPlan, PlanError> {
    let total = collection.len();
    u32::try_from(total).map_err(|_| PlanError(total))?;

    let mut items: Vec<Item> = collection.into_iter().collect();
    items.sort_by(|a, b| {
        let by_duration = match direction {
            SortDirection::Ascending => a.duration.cmp(&b.duration),
            SortDirection::Descending => b.duration.cmp(&a.duration),
        };
        by_duration.then_with(|| tie_break(a, b))
    });

    let entries = items
        .into_iter()
        .enumerate()
        .map(|(rank, item)| {
            let target = u32::try_from(rank).map_err(|_| PlanError(total))?;
            Ok(PlanEntry { item, target })
        })
        .collect::<Result<Vec<_>, PlanError>>()?;
    Ok(PositionPlan { entries })
}

fn tie_break(a: &Item, b: &Item) -> Ordering {
    a.position
        .cmp(&b.position)
        .then_with(|| a.video_id.cmp(&b.video_id))
}
