use std::collections::{HashMap, HashSet};

use storefront_states::TaskId;
use ustr::Ustr;

/// What a row is waiting on. Rows that are not busy have no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BusyStatus {
    #[default]
    Idle,
    Adding,
    Removing,
}

/// Selected ids, busy flags and per-row errors for one backing list.
///
/// Invariant: every id in `selected`, `busy` and `errors` is in `backing`.
/// A busy row is owned by the task that marked it; only that task can
/// settle or release it.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    backing: Vec<Ustr>,
    selected: HashSet<Ustr>,
    busy: HashMap<Ustr, (BusyStatus, TaskId)>,
    errors: HashMap<Ustr, String>,
}

/// Keeps the first occurrence of every id.
fn dedup_in_order(ids: impl IntoIterator<Item = Ustr>) -> (Vec<Ustr>, HashSet<Ustr>) {
    let mut seen = HashSet::new();
    let ordered = ids.into_iter().filter(|id| seen.insert(*id)).collect();
    (ordered, seen)
}

impl Selection {
    pub fn new(backing: impl IntoIterator<Item = Ustr>) -> Self {
        Self {
            backing: dedup_in_order(backing).0,
            ..Self::default()
        }
    }

    /// Replaces the backing list and prunes everything that left it.
    pub fn set_backing(&mut self, backing: impl IntoIterator<Item = Ustr>) {
        let (backing, known) = dedup_in_order(backing);
        self.backing = backing;
        self.selected.retain(|id| known.contains(id));
        self.busy.retain(|id, _| known.contains(id));
        self.errors.retain(|id, _| known.contains(id));
    }

    /// Drops one id from the backing list and from all row state.
    pub fn forget(&mut self, id: Ustr) {
        self.backing.retain(|known| *known != id);
        self.selected.remove(&id);
        self.busy.remove(&id);
        self.errors.remove(&id);
    }

    pub fn contains(&self, id: Ustr) -> bool {
        self.backing.contains(&id)
    }

    /// Flips one row. Ids outside the backing list are ignored.
    ///
    /// Returns whether the row is selected afterwards.
    pub fn toggle(&mut self, id: Ustr) -> bool {
        if !self.contains(id) {
            return false;
        }
        if self.selected.remove(&id) {
            false
        } else {
            self.selected.insert(id);
            true
        }
    }

    /// All or none: clears a full selection, otherwise selects every row.
    pub fn toggle_all(&mut self) {
        if self.selected.len() == self.backing.len() {
            self.selected.clear();
        } else {
            self.selected = self.backing.iter().copied().collect();
        }
    }

    /// Drives the "select all" checkbox.
    pub fn all_selected(&self) -> bool {
        !self.backing.is_empty() && self.selected.len() == self.backing.len()
    }

    pub fn is_selected(&self, id: Ustr) -> bool {
        self.selected.contains(&id)
    }

    pub fn selected_count(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    /// Selected ids in backing-list order.
    pub fn selected_in_order(&self) -> Vec<Ustr> {
        self.backing
            .iter()
            .copied()
            .filter(|id| self.selected.contains(id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Marks a row busy on behalf of `task` and clears its previous error.
    ///
    /// `BusyStatus::Idle` is ignored; use [`Selection::release`].
    pub fn mark_busy(&mut self, id: Ustr, status: BusyStatus, task: TaskId) {
        if !self.contains(id) || status == BusyStatus::Idle {
            return;
        }
        self.errors.remove(&id);
        self.busy.insert(id, (status, task));
    }

    /// Ends `task`'s operation on a row, recording the error if there was one.
    ///
    /// Returns `false`, changing nothing, when the row is not owned by `task`.
    pub fn settle(&mut self, id: Ustr, task: TaskId, result: Result<(), String>) -> bool {
        if self.owner(id) != Some(task) {
            return false;
        }
        self.busy.remove(&id);
        match result {
            Ok(()) => {
                self.errors.remove(&id);
            }
            Err(message) => {
                self.errors.insert(id, message);
            }
        }
        true
    }

    /// Frees a row still owned by `task` without touching its error.
    pub fn release(&mut self, id: Ustr, task: TaskId) -> bool {
        if self.owner(id) != Some(task) {
            return false;
        }
        self.busy.remove(&id);
        true
    }

    pub fn owner(&self, id: Ustr) -> Option<TaskId> {
        self.busy.get(&id).map(|(_, task)| *task)
    }

    pub fn busy(&self, id: Ustr) -> BusyStatus {
        self.busy
            .get(&id)
            .map(|(status, _)| *status)
            .unwrap_or_default()
    }

    pub fn is_busy(&self, id: Ustr) -> bool {
        self.busy.contains_key(&id)
    }

    pub fn any_busy(&self) -> bool {
        !self.busy.is_empty()
    }

    pub fn item_error(&self, id: Ustr) -> Option<&str> {
        self.errors.get(&id).map(String::as_str)
    }
}
