//! Replication feeder
//!
//! Ships the mutations of committed transactions to one peer as
//! `ReplicationWireRecord` frames. Mutations are held per transaction until
//! its commit marker is read and dropped when its abort marker is read.
//! Control items themselves are not shipped, and neither are insertions
//! into the internal before-image store: a before-image only travels
//! attached to the mutation that superseded it.
//!
//! The last `window` shipped items are kept with their memos so a
//! retransmission reuses each item's resolved before-image (after
//! re-checking its expiration) instead of reading the store again.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use tracing::debug;

use strata_core::log_version::check_supported;
use strata_core::{Clock, Lsn, Result};
use strata_durability::{LogBuffer, LogEntryType, RawLogItem, BEFORE_IMAGE_DB_ID};
use strata_storage::BeforeImageStore;
use strata_wire::{LogItem, ReplicationWireRecord};

/// Default number of shipped items kept for retransmission
pub const DEFAULT_WINDOW: usize = 256;

/// Produces wire frames for one outbound channel
#[derive(Debug)]
pub struct Feeder {
    log: Arc<LogBuffer>,
    store: Arc<dyn BeforeImageStore>,
    clock: Arc<dyn Clock>,
    protocol_version: u8,
    next_index: usize,
    /// Mutations of transactions without a commit or abort marker yet
    pending: BTreeMap<u64, Vec<RawLogItem>>,
    window: VecDeque<LogItem>,
    window_size: usize,
}

impl Feeder {
    /// Feeder for a peer speaking `protocol_version`
    pub fn new(
        log: Arc<LogBuffer>,
        store: Arc<dyn BeforeImageStore>,
        clock: Arc<dyn Clock>,
        protocol_version: u8,
    ) -> Result<Self> {
        check_supported(protocol_version)?;
        Ok(Feeder {
            log,
            store,
            clock,
            protocol_version,
            next_index: 0,
            pending: BTreeMap::new(),
            window: VecDeque::new(),
            window_size: DEFAULT_WINDOW,
        })
    }

    /// Keep at most `size` shipped items for retransmission
    pub fn with_window(mut self, size: usize) -> Self {
        self.window_size = size;
        self
    }

    /// Peer protocol version
    pub fn protocol_version(&self) -> u8 {
        self.protocol_version
    }

    /// Items currently held for retransmission
    pub fn window_len(&self) -> usize {
        self.window.len()
    }

    /// Transactions whose mutations await a commit or abort marker
    pub fn pending_txns(&self) -> usize {
        self.pending.len()
    }

    fn resolve(&self, item: &mut LogItem) -> Result<ReplicationWireRecord> {
        ReplicationWireRecord::new(item, self.store.as_ref(), self.clock.as_ref())
    }

    fn ship(
        &mut self,
        raw: RawLogItem,
        out: &mut Vec<u8>,
        shipped: &mut Vec<ReplicationWireRecord>,
    ) -> Result<()> {
        let mut item = LogItem::new(raw);
        let record = self.resolve(&mut item)?;
        record.write(out, self.protocol_version)?;
        shipped.push(record);

        self.window.push_back(item);
        while self.window.len() > self.window_size {
            self.window.pop_front();
        }
        Ok(())
    }

    /// Append frames for every transaction committed since the last poll
    ///
    /// Returns the resolved records in commit order, each transaction's
    /// mutations in log order.
    pub fn poll(&mut self, out: &mut Vec<u8>) -> Result<Vec<ReplicationWireRecord>> {
        let items = self.log.items()?;
        let mut shipped = Vec::new();
        for raw in items.into_iter().skip(self.next_index) {
            self.next_index += 1;
            match raw.header.log_entry_type()? {
                LogEntryType::TxnCommit => {
                    let txn_id = raw.control_txn_id()?;
                    for held in self.pending.remove(&txn_id).unwrap_or_default() {
                        self.ship(held, out, &mut shipped)?;
                    }
                }
                LogEntryType::TxnAbort => {
                    let txn_id = raw.control_txn_id()?;
                    if let Some(dropped) = self.pending.remove(&txn_id) {
                        debug!(txn_id, dropped = dropped.len(), "dropped aborted mutations");
                    }
                }
                LogEntryType::Checkpoint => {}
                _ => {
                    let base = raw.decode_mutation()?.into_base();
                    if base.db_id != BEFORE_IMAGE_DB_ID {
                        self.pending.entry(base.txn_id).or_default().push(raw);
                    }
                }
            }
        }
        if !shipped.is_empty() {
            debug!(
                records = shipped.len(),
                bytes = out.len(),
                "shipped mutation records"
            );
        }
        Ok(shipped)
    }

    /// Append frames again for windowed items at or after `from`
    pub fn retransmit_from(
        &mut self,
        from: Lsn,
        out: &mut Vec<u8>,
    ) -> Result<Vec<ReplicationWireRecord>> {
        let mut window = std::mem::take(&mut self.window);
        let result: Result<Vec<_>> = window
            .iter_mut()
            .filter(|item| item.lsn() >= from)
            .map(|item| -> Result<ReplicationWireRecord> {
                let record = self.resolve(item)?;
                record.write(out, self.protocol_version)?;
                Ok(record)
            })
            .collect();
        self.window = window;
        result
    }
}
