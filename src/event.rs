//! Decoded events, historical event iteration and live event subscriptions.

use alloy::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, TxHash},
    rpc::types::{Filter, FilterSet, Log},
};
use futures::StreamExt;
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    backend::LogStream,
    descriptor::EventEntry,
    error::{Error, Result},
    options::WatchOptions,
    value,
};

/// Event decoded from a raw log.
#[derive(Clone, Debug, PartialEq)]
pub struct DecodedEvent {
    name: String,
    fields: Vec<(String, DynSolValue)>,
    log: Log,
}

impl DecodedEvent {
    pub(crate) fn new(name: String, fields: Vec<(String, DynSolValue)>, log: Log) -> Self {
        Self { name, fields, log }
    }

    /// Binding name of the event.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Decoded fields in declaration order.
    pub fn fields(&self) -> &[(String, DynSolValue)] {
        &self.fields
    }

    /// Field by its name.
    pub fn get(&self, name: &str) -> Option<&DynSolValue> {
        self.fields
            .iter()
            .find(|(n, _)| !n.is_empty() && n == name)
            .map(|(_, v)| v)
    }

    pub fn values(&self) -> impl Iterator<Item = &DynSolValue> {
        self.fields.iter().map(|(_, v)| v)
    }

    /// Raw log the event was decoded from.
    pub fn log(&self) -> &Log {
        &self.log
    }

    pub fn address(&self) -> Address {
        self.log.address()
    }

    pub fn tx_hash(&self) -> Option<TxHash> {
        self.log.transaction_hash
    }

    pub fn tx_index(&self) -> Option<u64> {
        self.log.transaction_index
    }

    pub fn block_number(&self) -> Option<u64> {
        self.log.block_number
    }

    pub fn block_hash(&self) -> Option<B256> {
        self.log.block_hash
    }

    pub fn log_index(&self) -> Option<u64> {
        self.log.log_index
    }

    /// Whether the log was removed by a chain reorganization.
    pub fn removed(&self) -> bool {
        self.log.removed
    }
}

/// Log filter of the given event emitted by the contract.
///
/// `rules` holds one list of accepted values per indexed parameter in
/// declaration order, an empty list matches any value. Trailing parameters
/// without a list match any value as well.
pub(crate) fn build_filter(
    address: Address,
    event: &EventEntry,
    rules: &[Vec<DynSolValue>],
) -> Result<Filter> {
    let indexed = event.indexed_types();
    if rules.len() > indexed.len() {
        return Err(Error::Encoding(format!(
            "{} has {} indexed parameter(s), got {} filter rule(s)",
            event.signature(),
            indexed.len(),
            rules.len()
        )));
    }

    let mut filter = Filter::new().address(address);
    // Anonymous events have no signature topic, indexed parameters start at topic0
    let offset = if event.is_anonymous() {
        0
    } else {
        filter = filter.event_signature(event.topic());
        1
    };
    for (pos, (ty, values)) in indexed.iter().zip(rules).enumerate() {
        let topics = values
            .iter()
            .map(|v| value::topic(ty, v))
            .collect::<Result<Vec<_>>>()?;
        let slot = filter.topics.get_mut(pos + offset).ok_or_else(|| {
            Error::Encoding(format!("{} has more topics than a log", event.signature()))
        })?;
        *slot = FilterSet::from(topics);
    }
    Ok(filter)
}

/// Pull-style iterator over events of one historical log query.
///
/// Logs are decoded one at a time by [`EventIterator::advance`]. The iterator
/// is finite and can not be restarted, run the query again for that. The
/// first decoding error stops iteration and is kept, so exhaustion and
/// failure can be told apart with [`EventIterator::error`].
#[derive(Debug)]
pub struct EventIterator {
    logs: std::vec::IntoIter<Log>,
    entry: EventEntry,
    current: Option<DecodedEvent>,
    fail: Option<Error>,
    done: bool,
    reported: bool,
}

impl EventIterator {
    pub(crate) fn new(entry: EventEntry, logs: Vec<Log>) -> Self {
        Self {
            logs: logs.into_iter(),
            entry,
            current: None,
            fail: None,
            done: false,
            reported: false,
        }
    }

    /// Moves to the next event, returns `false` once exhausted or failed.
    pub fn advance(&mut self) -> bool {
        if self.done {
            return false;
        }
        let Some(log) = self.logs.next() else {
            self.done = true;
            self.current = None;
            return false;
        };
        match self.entry.decode_log(log) {
            Ok(event) => {
                self.current = Some(event);
                true
            }
            Err(err) => {
                self.done = true;
                self.current = None;
                self.fail = Some(err);
                false
            }
        }
    }

    /// Event the iterator is positioned at after a successful
    /// [`EventIterator::advance`].
    pub fn event(&self) -> Option<&DecodedEvent> {
        self.current.as_ref()
    }

    /// Error that stopped the iteration, if any.
    pub fn error(&self) -> Option<&Error> {
        self.fail.as_ref()
    }

    /// Number of logs not yet visited.
    pub fn remaining(&self) -> usize {
        if self.done { 0 } else { self.logs.len() }
    }
}

impl Iterator for EventIterator {
    type Item = Result<DecodedEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.advance() {
            return self.current.take().map(Ok);
        }
        // The failure is yielded once, then the iterator is exhausted
        if self.reported {
            return None;
        }
        self.reported = true;
        self.fail.clone().map(Err)
    }
}

/// Push-style subscription to live events.
///
/// Events are decoded and delivered by a background task in the order the
/// log source produces them. The task stops when the subscription is
/// dropped or unsubscribed, when the log source ends, or on the first error
/// it encounters, which is then returned by [`EventSubscription::wait`].
#[derive(Debug)]
pub struct EventSubscription {
    events: mpsc::Receiver<DecodedEvent>,
    quit: Option<oneshot::Sender<()>>,
    handle: JoinHandle<Result<()>>,
}

impl EventSubscription {
    pub(crate) fn start(entry: EventEntry, logs: LogStream, opts: &WatchOptions) -> Self {
        let (tx, rx) = mpsc::channel(opts.channel_size.max(1));
        let (quit_tx, quit_rx) = oneshot::channel();
        let skip_malformed = opts.skip_malformed;
        let handle = tokio::spawn(async move {
            run_subscription(entry, logs, skip_malformed, tx, quit_rx).await
        });
        Self {
            events: rx,
            quit: Some(quit_tx),
            handle,
        }
    }

    /// Next delivered event, `None` once the subscription has ended and all
    /// delivered events are consumed.
    pub async fn recv(&mut self) -> Option<DecodedEvent> {
        self.events.recv().await
    }

    /// Non-blocking variant of [`EventSubscription::recv`].
    pub fn try_recv(&mut self) -> Option<DecodedEvent> {
        self.events.try_recv().ok()
    }

    /// Whether the background task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Waits for the subscription to end on its own and returns the error
    /// that terminated it, if any.
    ///
    /// Events not received yet are discarded.
    pub async fn wait(mut self) -> Result<()> {
        // The channel closes once the task returns
        while self.events.recv().await.is_some() {}
        join(&mut self.handle).await
    }

    /// Cancels the subscription and waits for the background task to stop.
    ///
    /// Returns the error the subscription failed with before cancellation,
    /// if any.
    pub async fn unsubscribe(mut self) -> Result<()> {
        if let Some(quit) = self.quit.take() {
            let _ = quit.send(());
        }
        self.events.close();
        join(&mut self.handle).await
    }
}

async fn join(handle: &mut JoinHandle<Result<()>>) -> Result<()> {
    match handle.await {
        Ok(result) => result,
        Err(err) => Err(Error::Subscription(err.to_string())),
    }
}

async fn run_subscription(
    entry: EventEntry,
    mut logs: LogStream,
    skip_malformed: bool,
    tx: mpsc::Sender<DecodedEvent>,
    mut quit: oneshot::Receiver<()>,
) -> Result<()> {
    tracing::debug!(event = entry.binding_name(), "subscription started");
    loop {
        let log = tokio::select! {
            biased;
            _ = &mut quit => {
                tracing::debug!(event = entry.binding_name(), "subscription cancelled");
                return Ok(());
            }
            _ = tx.closed() => {
                tracing::debug!(event = entry.binding_name(), "subscription receiver dropped");
                return Ok(());
            }
            log = logs.next() => log,
        };

        let log = match log {
            Some(Ok(log)) => log,
            Some(Err(err)) => {
                tracing::debug!(event = entry.binding_name(), %err, "log source failed");
                return Err(err.into());
            }
            None => {
                tracing::debug!(event = entry.binding_name(), "log source ended");
                return Ok(());
            }
        };

        let event = match entry.decode_log(log) {
            Ok(event) => event,
            Err(err) if skip_malformed => {
                tracing::warn!(event = entry.binding_name(), %err, "skipping malformed log");
                continue;
            }
            Err(err) => return Err(err),
        };
        tracing::trace!(
            event = entry.binding_name(),
            block = ?event.block_number(),
            log_index = ?event.log_index(),
            "delivering event"
        );

        tokio::select! {
            biased;
            _ = &mut quit => {
                tracing::debug!(event = entry.binding_name(), "subscription cancelled");
                return Ok(());
            }
            sent = tx.send(event) => {
                if sent.is_err() {
                    tracing::debug!(event = entry.binding_name(), "subscription receiver dropped");
                    return Ok(());
                }
            }
        }
    }
}
