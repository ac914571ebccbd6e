//! The wishlist controller.
//!
//! Same shape as the OTP controller: state is owned here and only changed
//! while applying updates; requests run as spawned tasks that report back
//! through a channel and are cancelled when the controller is dropped.
//!
//! Every result carries the `TaskId` of the request that produced it. A row
//! is only freed by the task that marked it busy, and only the most recently
//! issued load may replace the backing list.

use std::collections::HashMap;

use flume::{Receiver, Sender};
use log::{debug, info, warn};
use storefront_states::{TaskHandle, TaskId, TaskSet};
use ustr::Ustr;

use super::api::{WishlistApi, WishlistItem};
use super::selection::{BusyStatus, Selection};
use crate::notice::{Notice, Notices};
use crate::session::SessionSlot;
use crate::{StorefrontError, ValidationError};

const LOAD_TASK: &str = "load-wishlist";
const ADD_TASK: &str = "add-to-cart";
const REMOVE_TASK: &str = "remove-item";
const BULK_TASK: &str = "bulk-add-to-cart";

#[derive(Debug)]
enum WishlistUpdate {
    Loaded {
        task: TaskId,
        items: Vec<WishlistItem>,
    },
    LoadFailed {
        task: TaskId,
        message: String,
    },
    AddStarted {
        id: Ustr,
        task: TaskId,
    },
    Added {
        id: Ustr,
        task: TaskId,
        result: Result<(), String>,
        standalone: bool,
    },
    Removed {
        id: Ustr,
        task: TaskId,
        result: Result<(), String>,
    },
    BulkFinished {
        moved: usize,
        total: usize,
    },
    Settled {
        task: TaskId,
        row: Option<Ustr>,
    },
}

/// Retires its task, and frees its row if the task still owns it, however
/// the task ends.
struct SettleGuard {
    tx: Sender<WishlistUpdate>,
    task: TaskId,
    row: Option<Ustr>,
}

impl Drop for SettleGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(WishlistUpdate::Settled {
            task: self.task,
            row: self.row,
        });
    }
}

#[derive(Debug)]
pub struct WishlistController {
    items: Vec<WishlistItem>,
    selection: Selection,
    api: WishlistApi,
    auth_token: String,
    notices: Notices,
    /// The load whose result may replace the backing list.
    latest_load: Option<TaskId>,
    /// Ids removed locally, with the task generation at removal time.
    removed: HashMap<Ustr, u64>,
    tx: Sender<WishlistUpdate>,
    rx: Receiver<WishlistUpdate>,
    tasks: TaskSet,
}

impl WishlistController {
    /// Mounts the controller and starts loading the wishlist.
    ///
    /// Requires a signed-in shopper. Must be called from within a tokio runtime.
    pub fn mount(api: WishlistApi, session: &SessionSlot) -> Result<Self, StorefrontError> {
        let auth_token = session.auth_token()?;
        let (tx, rx) = flume::unbounded();

        let mut controller = Self {
            items: Vec::new(),
            selection: Selection::default(),
            api,
            auth_token,
            notices: Notices::default(),
            latest_load: None,
            removed: HashMap::new(),
            tx,
            rx,
            tasks: TaskSet::default(),
        };
        controller.load();
        Ok(controller)
    }

    pub fn items(&self) -> &[WishlistItem] {
        &self.items
    }

    pub fn item(&self, id: Ustr) -> Option<&WishlistItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn notices_mut(&mut self) -> &mut Notices {
        &mut self.notices
    }

    pub fn is_loading(&self) -> bool {
        self.tasks.contains_label(LOAD_TASK)
    }

    pub fn is_bulk_running(&self) -> bool {
        self.tasks.contains_label(BULK_TASK)
    }

    /// Whether the row's add-to-cart button should be enabled.
    ///
    /// Stock is only checked here; out-of-stock rows can still be selected.
    pub fn can_add(&self, id: Ustr) -> bool {
        self.item(id)
            .is_some_and(|item| item.stock_status.is_purchasable())
            && !self.selection.is_busy(id)
            && !self.is_bulk_running()
    }

    /// Re-fetches the backing list. Supersedes any load still in flight.
    pub fn load(&mut self) {
        info!("WishlistController: loading wishlist");
        let handle = self.tasks.issue(LOAD_TASK);
        let task = handle.id();
        self.latest_load = Some(task);
        let guard = self.settle_guard(&handle, None);
        let tx = self.tx.clone();
        let api = self.api.clone();
        let token = self.auth_token.clone();

        spawn_cancellable(handle, guard, async move {
            let update = match api.fetch(&token).await {
                Ok(items) => WishlistUpdate::Loaded { task, items },
                Err(err) => WishlistUpdate::LoadFailed {
                    task,
                    message: err.to_string(),
                },
            };
            if tx.send(update).is_err() {
                debug!("WishlistController: load finished after teardown");
            }
        });
    }

    pub fn toggle_select(&mut self, id: Ustr) -> bool {
        self.selection.toggle(id)
    }

    pub fn toggle_select_all(&mut self) {
        self.selection.toggle_all();
    }

    /// Moves one item to the cart.
    pub fn add_single_item(&mut self, id: Ustr) -> Result<(), StorefrontError> {
        self.ensure_row_free(id)?;

        info!("WishlistController: moving {id} to cart");
        let handle = self.tasks.issue(ADD_TASK);
        let task = handle.id();
        self.selection.mark_busy(id, BusyStatus::Adding, task);
        let guard = self.settle_guard(&handle, Some(id));
        let tx = self.tx.clone();
        let api = self.api.clone();
        let token = self.auth_token.clone();

        spawn_cancellable(handle, guard, async move {
            let result = api
                .move_to_cart(&token, id)
                .await
                .map_err(|e| e.to_string());
            let update = WishlistUpdate::Added {
                id,
                task,
                result,
                standalone: true,
            };
            if tx.send(update).is_err() {
                debug!("WishlistController: add finished after teardown");
            }
        });
        Ok(())
    }

    /// Removes one item from the wishlist.
    pub fn remove_item(&mut self, id: Ustr) -> Result<(), StorefrontError> {
        self.ensure_row_free(id)?;

        info!("WishlistController: removing {id}");
        let handle = self.tasks.issue(REMOVE_TASK);
        let task = handle.id();
        self.selection.mark_busy(id, BusyStatus::Removing, task);
        let guard = self.settle_guard(&handle, Some(id));
        let tx = self.tx.clone();
        let api = self.api.clone();
        let token = self.auth_token.clone();

        spawn_cancellable(handle, guard, async move {
            let result = api.remove(&token, id).await.map_err(|e| e.to_string());
            if tx.send(WishlistUpdate::Removed { id, task, result }).is_err() {
                debug!("WishlistController: remove finished after teardown");
            }
        });
        Ok(())
    }

    /// Moves every selected item to the cart, one request at a time.
    ///
    /// A failed item does not stop the rest. The selection is cleared once
    /// the whole sequence has run.
    pub fn bulk_add_selected(&mut self) -> Result<(), StorefrontError> {
        if self.selection.is_empty() {
            info!("WishlistController: bulk add with nothing selected");
            return Err(self.report(ValidationError::NothingSelected.into()));
        }
        if self.is_bulk_running() {
            return Err(self.report(ValidationError::Busy.into()));
        }

        // Rows already busy on their own keep their own request.
        let ids: Vec<Ustr> = self
            .selection
            .selected_in_order()
            .into_iter()
            .filter(|id| !self.selection.is_busy(*id))
            .collect();
        info!("WishlistController: moving {} items to cart", ids.len());

        let handle = self.tasks.issue(BULK_TASK);
        let task = handle.id();
        let guard = self.settle_guard(&handle, None);
        let tx = self.tx.clone();
        let api = self.api.clone();
        let token = self.auth_token.clone();

        spawn_cancellable(handle, guard, async move {
            let total = ids.len();
            let mut moved = 0;
            for id in ids {
                if tx.send(WishlistUpdate::AddStarted { id, task }).is_err() {
                    return;
                }
                let result = api
                    .move_to_cart(&token, id)
                    .await
                    .map_err(|e| e.to_string());
                if result.is_ok() {
                    moved += 1;
                }
                let update = WishlistUpdate::Added {
                    id,
                    task,
                    result,
                    standalone: false,
                };
                if tx.send(update).is_err() {
                    return;
                }
            }
            if tx.send(WishlistUpdate::BulkFinished { moved, total }).is_err() {
                debug!("WishlistController: bulk add finished after teardown");
            }
        });
        Ok(())
    }

    /// Applies every update that has already arrived. Never waits.
    pub fn sync(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(update) = self.rx.try_recv() {
            self.apply(update);
            applied += 1;
        }
        applied
    }

    /// Waits for the next update and applies it.
    pub async fn next_update(&mut self) {
        if let Ok(update) = self.rx.recv_async().await {
            self.apply(update);
        }
    }

    /// Waits until no request is in flight, including follow-up refreshes.
    pub async fn settle(&mut self) {
        self.sync();
        while !self.tasks.is_empty() {
            self.next_update().await;
        }
    }

    fn apply(&mut self, update: WishlistUpdate) {
        match update {
            WishlistUpdate::Loaded { task, items } => self.apply_loaded(task, items),
            WishlistUpdate::LoadFailed { task, message } => {
                if self.latest_load != Some(task) {
                    debug!("WishlistController: ignoring failure of superseded load");
                    return;
                }
                warn!("WishlistController: load failed: {message}");
                self.notices.push(Notice::error(message));
            }
            WishlistUpdate::AddStarted { id, task } => {
                self.selection.mark_busy(id, BusyStatus::Adding, task);
            }
            WishlistUpdate::Added {
                id,
                task,
                result,
                standalone,
            } => {
                if let Err(message) = &result {
                    warn!("WishlistController: moving {id} to cart failed: {message}");
                    if standalone {
                        self.notices.push(Notice::error(message.clone()));
                    }
                } else if standalone {
                    self.notices.push(Notice::success("Moved to cart"));
                }
                let refresh = standalone && result.is_ok();
                self.selection.settle(id, task, result);
                if refresh {
                    self.load();
                }
            }
            WishlistUpdate::Removed { id, task, result } => match result {
                Ok(()) => {
                    info!("WishlistController: removed {id}");
                    self.items.retain(|item| item.id != id);
                    self.selection.forget(id);
                    self.removed.insert(id, self.tasks.generation());
                    self.notices.push(Notice::success("Removed from wishlist"));
                }
                Err(message) => {
                    warn!("WishlistController: removing {id} failed: {message}");
                    self.notices.push(Notice::error(message.clone()));
                    self.selection.settle(id, task, Err(message));
                }
            },
            WishlistUpdate::BulkFinished { moved, total } => {
                info!("WishlistController: bulk add moved {moved} of {total}");
                self.selection.clear();
                let message = format!("Moved {moved} of {total} items to cart");
                self.notices.push(if moved == total {
                    Notice::success(message)
                } else {
                    Notice::error(message)
                });
                self.load();
            }
            WishlistUpdate::Settled { task, row } => {
                self.tasks.retire(task);
                if let Some(id) = row
                    && self.selection.release(id, task)
                {
                    debug!("WishlistController: {} ended without a result", task.label());
                }
            }
        }
    }

    fn apply_loaded(&mut self, task: TaskId, mut items: Vec<WishlistItem>) {
        if self.latest_load != Some(task) {
            debug!("WishlistController: dropping result of superseded load");
            return;
        }

        // A load issued before a local removal may still list the removed item.
        let generation = task.generation();
        items.retain(|item| {
            self.removed
                .get(&item.id)
                .is_none_or(|removed_at| *removed_at < generation)
        });
        self.removed.retain(|_, removed_at| *removed_at >= generation);

        debug!("WishlistController: {} items loaded", items.len());
        self.selection.set_backing(items.iter().map(|item| item.id));
        self.items = items;
    }

    fn ensure_row_free(&mut self, id: Ustr) -> Result<(), StorefrontError> {
        if !self.selection.contains(id) {
            return Err(self.report(ValidationError::UnknownItem.into()));
        }
        if self.selection.is_busy(id) || self.is_bulk_running() {
            return Err(self.report(ValidationError::Busy.into()));
        }
        Ok(())
    }

    fn settle_guard(&self, handle: &TaskHandle, row: Option<Ustr>) -> SettleGuard {
        SettleGuard {
            tx: self.tx.clone(),
            task: handle.id(),
            row,
        }
    }

    fn report(&mut self, err: StorefrontError) -> StorefrontError {
        self.notices.push(Notice::from(&err));
        err
    }
}

impl Drop for WishlistController {
    fn drop(&mut self) {
        debug!(
            "WishlistController: unmounting with {} request(s) in flight",
            self.tasks.len()
        );
        self.tasks.cancel_all();
    }
}

fn spawn_cancellable<F>(handle: TaskHandle, guard: SettleGuard, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let token = handle.cancellation_token();
    tokio::spawn(async move {
        let _guard = guard;
        tokio::select! {
            _ = token.cancelled() => {
                debug!("WishlistController: {} cancelled", handle.id().label());
            }
            _ = work => {}
        }
    });
}
