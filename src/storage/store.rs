//! Durable state: nonces, orders, grids, settings, strategies and wallets.
//!
//! Tables live in memory behind one lock. Every unit of work is staged as a
//! list of row changes, appended to a JSONL journal as a single line, and only
//! then applied to the live tables, so a failed write leaves both memory and
//! disk unchanged. Opening the store replays the journal and compacts it when
//! superseded rows dominate.

use alloy::primitives::Address;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::{
    errors::{GridError, GridResult},
    nonce::NonceStore,
    storage::{OrderClosing, OrderRejection},
    types::{
        Grid, GridStatus, GridTransition, NewOrder, NonceRecord, Order, OrderStatus, Settings,
        SettingsUpdate, Strategy, Wallet,
    },
};

/// Journals shorter than this are never compacted.
const COMPACT_MIN_LINES: usize = 1024;

/// One row written by a unit of work.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "table", content = "row", rename_all = "snake_case")]
enum Change {
    Nonce(NonceRecord),
    Order(Order),
    Grid(Grid),
    DeleteGrid(String),
    Settings(Settings),
    Strategy(Strategy),
    Wallet(Wallet),
}

#[derive(Debug, Serialize, Deserialize)]
struct JournalEntry {
    at: DateTime<Utc>,
    changes: Vec<Change>,
}

#[derive(Debug, Default)]
struct Tables {
    next_order_id: u64,
    nonces: BTreeMap<Address, NonceRecord>,
    orders: BTreeMap<u64, Order>,
    /// Pending orders keyed by creation time, then id.
    pending: BTreeSet<(DateTime<Utc>, u64)>,
    grids: BTreeMap<String, Grid>,
    settings: BTreeMap<i64, Settings>,
    strategies: BTreeMap<String, Strategy>,
    wallets: Vec<Wallet>,
}

impl Tables {
    fn apply(&mut self, change: Change) {
        match change {
            Change::Nonce(record) => {
                self.nonces.insert(record.account, record);
            }
            Change::Order(order) => {
                let key = (order.created_at, order.id);
                if order.status == OrderStatus::Pending {
                    self.pending.insert(key);
                } else {
                    self.pending.remove(&key);
                }
                self.next_order_id = self.next_order_id.max(order.id);
                self.orders.insert(order.id, order);
            }
            Change::Grid(grid) => {
                self.grids.insert(grid.guid.clone(), grid);
            }
            Change::DeleteGrid(guid) => {
                self.grids.remove(&guid);
            }
            Change::Settings(settings) => {
                self.settings.insert(settings.user_id, settings);
            }
            Change::Strategy(strategy) => {
                self.strategies.insert(strategy.guid.clone(), strategy);
            }
            Change::Wallet(wallet) => match self.wallets.iter_mut().find(|w| w.user_id == wallet.user_id) {
                Some(existing) => *existing = wallet,
                None => self.wallets.push(wallet),
            },
        }
    }

    fn rows(&self) -> usize {
        self.nonces.len()
            + self.orders.len()
            + self.grids.len()
            + self.settings.len()
            + self.strategies.len()
            + self.wallets.len()
    }

    /// Every live row, one change each.
    fn snapshot(&self) -> Vec<Change> {
        let mut changes = Vec::with_capacity(self.rows());
        changes.extend(self.nonces.values().cloned().map(Change::Nonce));
        changes.extend(self.orders.values().cloned().map(Change::Order));
        changes.extend(self.grids.values().cloned().map(Change::Grid));
        changes.extend(self.settings.values().cloned().map(Change::Settings));
        changes.extend(self.strategies.values().cloned().map(Change::Strategy));
        changes.extend(self.wallets.iter().cloned().map(Change::Wallet));
        changes
    }

    fn pending_order(&self, order_id: u64) -> GridResult<Order> {
        let order = self.orders.get(&order_id).ok_or_else(|| GridError::NotFound {
            entity: "order",
            key: order_id.to_string(),
        })?;

        if order.status != OrderStatus::Pending {
            return Err(GridError::persistence(format!(
                "order {} is already {:?}",
                order_id, order.status
            )));
        }
        Ok(order.clone())
    }

    fn grid_change(&self, transition: &GridTransition) -> Option<Change> {
        let now = Utc::now();
        match transition {
            GridTransition::Delete { guid } => {
                if !self.grids.contains_key(guid) {
                    warn!("[Store] Grid {} already deleted", guid);
                    return None;
                }
                Some(Change::DeleteGrid(guid.clone()))
            }
            GridTransition::MarkBought { guid, price, quantity } => match self.grids.get(guid) {
                Some(grid) => {
                    let mut grid = grid.clone();
                    grid.status = GridStatus::Bought;
                    grid.price = *price;
                    grid.quantity = *quantity;
                    grid.updated_at = now;
                    Some(Change::Grid(grid))
                }
                None => {
                    warn!("[Store] Grid {} not found, cannot mark bought", guid);
                    None
                }
            },
            GridTransition::RevertToBought { guid } => match self.grids.get(guid) {
                Some(grid) => {
                    let mut grid = grid.clone();
                    grid.status = GridStatus::Bought;
                    grid.updated_at = now;
                    Some(Change::Grid(grid))
                }
                None => {
                    warn!("[Store] Grid {} not found, cannot revert", guid);
                    None
                }
            },
        }
    }
}

/// Append handle on the journal file.
struct Journal {
    file: File,
    len: u64,
}

impl Journal {
    async fn append(&mut self, changes: &[Change]) -> GridResult<()> {
        let entry = JournalEntry {
            at: Utc::now(),
            changes: changes.to_vec(),
        };
        let mut line = serde_json::to_vec(&entry).map_err(|e| GridError::Persistence {
            message: "failed to serialize journal entry".to_string(),
            source: Some(e.into()),
        })?;
        line.push(b'\n');

        let written = async {
            self.file.write_all(&line).await?;
            self.file.flush().await
        }
        .await;

        match written {
            Ok(()) => {
                self.len += line.len() as u64;
                Ok(())
            }
            Err(e) => {
                // Drop any partial line so the next entry starts clean.
                if let Err(truncate) = self.file.set_len(self.len).await {
                    error!("[Store] Failed to truncate journal after a failed write: {}", truncate);
                }
                Err(GridError::Persistence {
                    message: "failed to append to journal".to_string(),
                    source: Some(e.into()),
                })
            }
        }
    }
}

struct State {
    tables: Tables,
    journal: Option<Journal>,
}

pub struct Store {
    state: Mutex<State>,
}

fn io_error(message: String, e: std::io::Error) -> GridError {
    GridError::Persistence {
        message,
        source: Some(e.into()),
    }
}

/// Replays `path` into tables.
///
/// Returns the tables, the number of journal entries, and the byte length of
/// the complete lines. A torn trailing line past that length is discarded.
fn replay(path: &Path) -> GridResult<(Tables, usize, u64)> {
    let mut tables = Tables::default();
    if !path.exists() {
        return Ok((tables, 0, 0));
    }

    let raw = fs::read_to_string(path).map_err(|e| io_error(format!("failed to read {}", path.display()), e))?;
    let complete = raw.rfind('\n').map_or(0, |i| i + 1);
    let mut lines = 0;
    for (number, line) in raw[..complete].lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<JournalEntry>(line) {
            Ok(entry) => {
                lines += 1;
                for change in entry.changes {
                    tables.apply(change);
                }
            }
            Err(e) => warn!("[Store] Skipping unreadable journal line {} in {}: {}", number + 1, path.display(), e),
        }
    }
    if complete < raw.len() {
        warn!("[Store] Discarding torn tail of {} ({} bytes)", path.display(), raw.len() - complete);
    }
    Ok((tables, lines, complete as u64))
}

/// Rewrites the journal as a single entry holding every live row.
fn compact(path: &Path, tables: &Tables) -> GridResult<()> {
    let entry = JournalEntry {
        at: Utc::now(),
        changes: tables.snapshot(),
    };
    let mut line = serde_json::to_vec(&entry).map_err(|e| GridError::Persistence {
        message: "failed to serialize journal snapshot".to_string(),
        source: Some(e.into()),
    })?;
    line.push(b'\n');

    let tmp = path.with_extension("jsonl.tmp");
    fs::File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(&line)?;
            file.sync_all()
        })
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| io_error(format!("failed to compact {}", path.display()), e))
}

impl Store {
    /// Opens the journal at `path`, starting empty when the file does not exist yet.
    pub fn open(path: impl AsRef<Path>) -> GridResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(format!("failed to create {}", parent.display()), e))?;
        }

        let (tables, lines, mut len) = replay(&path)?;
        if lines >= COMPACT_MIN_LINES && lines > 2 * tables.rows() {
            compact(&path, &tables)?;
            len = fs::metadata(&path)
                .map_err(|e| io_error(format!("failed to stat {}", path.display()), e))?
                .len();
            info!("🗜️ Compacted store journal {} ({} entries)", path.display(), lines);
        }

        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| io_error(format!("failed to open {}", path.display()), e))?;
        file.set_len(len)
            .map_err(|e| io_error(format!("failed to truncate {}", path.display()), e))?;

        info!(
            "📂 Opened store {} ({} orders, {} pending, {} grids)",
            path.display(),
            tables.orders.len(),
            tables.pending.len(),
            tables.grids.len()
        );

        Ok(Self {
            state: Mutex::new(State {
                tables,
                journal: Some(Journal {
                    file: File::from_std(file),
                    len,
                }),
            }),
        })
    }

    /// Store without a backing file.
    pub fn in_memory() -> Self {
        Self {
            state: Mutex::new(State {
                tables: Tables::default(),
                journal: None,
            }),
        }
    }

    async fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        let state = self.state.lock().await;
        f(&state.tables)
    }

    /// Stages the changes produced by `f`, journals them, then applies them.
    async fn commit<T>(&self, f: impl FnOnce(&Tables, &mut Vec<Change>) -> GridResult<T>) -> GridResult<T> {
        let mut state = self.state.lock().await;
        let mut changes = Vec::new();
        let value = f(&state.tables, &mut changes)?;
        if changes.is_empty() {
            return Ok(value);
        }

        if let Some(journal) = state.journal.as_mut() {
            journal.append(&changes).await?;
        }
        for change in changes {
            state.tables.apply(change);
        }
        Ok(value)
    }

    // Orders

    pub async fn insert_order(&self, new_order: NewOrder) -> GridResult<Order> {
        let order = self
            .commit(|t, changes| {
                let order = new_order.into_order(t.next_order_id + 1, Utc::now());
                changes.push(Change::Order(order.clone()));
                Ok(order)
            })
            .await?;

        info!(
            order_id = order.id,
            hash = %order.tx_hash,
            side = %order.side,
            "[Store] Saved pending order"
        );
        Ok(order)
    }

    pub async fn find_order(&self, order_id: u64) -> Option<Order> {
        self.read(|t| t.orders.get(&order_id).cloned()).await
    }

    /// Oldest pending orders first.
    pub async fn pending_orders(&self, limit: usize) -> Vec<Order> {
        self.read(|t| {
            t.pending
                .iter()
                .take(limit)
                .filter_map(|(_, id)| t.orders.get(id).cloned())
                .collect()
        })
        .await
    }

    pub async fn close_order(&self, closing: &OrderClosing) -> GridResult<Order> {
        self.commit(|t, changes| {
            let mut order = t.pending_order(closing.order_id)?;

            if let Some(transition) = &closing.grid {
                changes.extend(t.grid_change(transition));
            }

            if order.is_grid_order() {
                if let Some(strategy) = closing.strategy_id.as_ref().and_then(|id| t.strategies.get(id)) {
                    if strategy.first_order_id.is_none() {
                        let mut strategy = strategy.clone();
                        strategy.first_order_id = Some(order.id);
                        changes.push(Change::Strategy(strategy));
                    }
                }
            }

            order.status = OrderStatus::Closed;
            order.final_price = closing.final_price;
            order.out_amount = closing.out_amount;
            if closing.profit.is_some() {
                order.profit = closing.profit;
            }
            order.updated_at = Utc::now();
            changes.push(Change::Order(order.clone()));
            Ok(order)
        })
        .await
    }

    pub async fn reject_order(&self, rejection: &OrderRejection) -> GridResult<Order> {
        self.commit(|t, changes| {
            let mut order = t.pending_order(rejection.order_id)?;

            if let Some(transition) = &rejection.grid {
                changes.extend(t.grid_change(transition));
            }

            order.status = OrderStatus::Rejected;
            order.reason = Some(rejection.reason.clone());
            order.updated_at = Utc::now();
            changes.push(Change::Order(order.clone()));
            Ok(order)
        })
        .await
    }

    // Grids

    pub async fn insert_grid(&self, grid: Grid) -> GridResult<()> {
        self.commit(|t, changes| {
            if t.grids.contains_key(&grid.guid) {
                return Err(GridError::persistence(format!("grid {} already exists", grid.guid)));
            }
            changes.push(Change::Grid(grid));
            Ok(())
        })
        .await
    }

    pub async fn find_grid(&self, guid: &str) -> Option<Grid> {
        self.read(|t| t.grids.get(guid).cloned()).await
    }

    pub async fn set_grid_status(&self, guid: &str, status: GridStatus) -> GridResult<()> {
        self.commit(|t, changes| {
            let mut grid = t.grids.get(guid).cloned().ok_or_else(|| GridError::NotFound {
                entity: "grid",
                key: guid.to_string(),
            })?;
            grid.status = status;
            grid.updated_at = Utc::now();
            changes.push(Change::Grid(grid));
            Ok(())
        })
        .await
    }

    // Settings

    pub async fn insert_settings(&self, settings: Settings) -> GridResult<()> {
        self.commit(|t, changes| {
            if t.settings.contains_key(&settings.user_id) {
                return Err(GridError::persistence(format!(
                    "settings for user {} already exist",
                    settings.user_id
                )));
            }
            changes.push(Change::Settings(settings));
            Ok(())
        })
        .await
    }

    pub async fn find_settings(&self, user_id: i64) -> Option<Settings> {
        self.read(|t| t.settings.get(&user_id).cloned()).await
    }

    pub async fn update_settings(&self, user_id: i64, updates: &[SettingsUpdate]) -> GridResult<Settings> {
        self.commit(|t, changes| {
            let mut settings = t.settings.get(&user_id).cloned().ok_or_else(|| GridError::NotFound {
                entity: "settings",
                key: user_id.to_string(),
            })?;
            for update in updates {
                update.apply(&mut settings);
            }
            changes.push(Change::Settings(settings.clone()));
            Ok(settings)
        })
        .await
    }

    // Strategies

    pub async fn insert_strategy(&self, strategy: Strategy) -> GridResult<()> {
        self.commit(|t, changes| {
            if t.strategies.contains_key(&strategy.guid) {
                return Err(GridError::persistence(format!("strategy {} already exists", strategy.guid)));
            }
            changes.push(Change::Strategy(strategy));
            Ok(())
        })
        .await
    }

    pub async fn find_strategy(&self, guid: &str) -> Option<Strategy> {
        self.read(|t| t.strategies.get(guid).cloned()).await
    }

    // Wallets

    pub async fn insert_wallet(&self, wallet: Wallet) -> GridResult<()> {
        self.commit(|t, changes| {
            if t.wallets.iter().any(|w| w.user_id == wallet.user_id || w.account == wallet.account) {
                return Err(GridError::persistence(format!(
                    "wallet for user {} or account {} already exists",
                    wallet.user_id, wallet.account
                )));
            }
            changes.push(Change::Wallet(wallet));
            Ok(())
        })
        .await
    }

    pub async fn find_wallet(&self, user_id: i64) -> Option<Wallet> {
        self.read(|t| t.wallets.iter().find(|w| w.user_id == user_id).cloned()).await
    }

    pub async fn find_wallet_by_account(&self, account: Address) -> Option<Wallet> {
        self.read(|t| t.wallets.iter().find(|w| w.account == account).cloned()).await
    }
}

#[async_trait]
impl NonceStore for Store {
    async fn last_issued_nonce(&self, account: Address) -> GridResult<Option<u64>> {
        Ok(self.read(|t| t.nonces.get(&account).map(|r| r.last_issued_nonce)).await)
    }

    async fn record_issued_nonce(&self, account: Address, nonce: u64) -> GridResult<()> {
        self.commit(|_, changes| {
            changes.push(Change::Nonce(NonceRecord {
                account,
                last_issued_nonce: nonce,
                updated_at: Utc::now(),
            }));
            Ok(())
        })
        .await?;

        debug!("[Store] Recorded nonce {} for {}", nonce, account);
        Ok(())
    }
}
