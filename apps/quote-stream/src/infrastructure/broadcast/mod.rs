//! Broadcast Channel Adapter
//!
//! Implements quote distribution using a tokio broadcast channel for
//! fan-out to every open stream.
//!
//! # Architecture
//!
//! Each provider owns one `QuoteBroadcast`. The production loop is the
//! only sender; every call to `QuoteProvider::stream` creates a new
//! receiver, so N connected clients each see every quote exactly once,
//! in production order. A receiver that falls more than `capacity`
//! messages behind skips the overwritten quotes and keeps going.
//!
//! Providers hold their feed in a `FeedSlot`. Closing the slot once the
//! production loop has exited drops the last sender, which ends every
//! open stream.

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use crate::application::ports::QuoteStream;
use crate::domain::quote::Quote;
use crate::infrastructure::metrics;

/// Default broadcast channel capacity.
pub const DEFAULT_CAPACITY: usize = 10_000;

/// Single-producer, multi-subscriber quote feed.
///
/// # Example
///
/// ```rust
/// use quote_stream::infrastructure::broadcast::QuoteBroadcast;
///
/// let feed = QuoteBroadcast::new(16);
/// let _stream = feed.subscribe();
/// assert_eq!(feed.receiver_count(), 1);
/// ```
#[derive(Debug, Clone)]
pub struct QuoteBroadcast {
    tx: broadcast::Sender<Quote>,
}

impl QuoteBroadcast {
    /// Create a new feed with the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Create a new feed with the default capacity.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Publish a quote to all open streams.
    ///
    /// Returns the number of receivers that will observe it, or `None`
    /// if no stream is open (the quote is discarded).
    pub fn publish(&self, quote: Quote) -> Option<usize> {
        self.tx.send(quote).ok()
    }

    /// Open a new stream on the feed.
    ///
    /// The stream ends once every sender has been dropped.
    #[must_use]
    pub fn subscribe(&self) -> QuoteStream {
        BroadcastStream::new(self.tx.subscribe())
            .filter_map(|item| async move {
                match item {
                    Ok(quote) => Some(quote),
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Quote subscriber lagged");
                        metrics::record_quotes_dropped(skipped);
                        None
                    }
                }
            })
            .boxed()
    }

    /// Get the number of open streams.
    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for QuoteBroadcast {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// A provider's handle on its feed, closed when the provider stops.
#[derive(Debug)]
pub struct FeedSlot {
    feed: Mutex<Option<QuoteBroadcast>>,
}

impl FeedSlot {
    /// Wrap an open feed.
    #[must_use]
    pub fn new(feed: QuoteBroadcast) -> Self {
        Self {
            feed: Mutex::new(Some(feed)),
        }
    }

    /// Get a sender for a production loop, or `None` once closed.
    #[must_use]
    pub fn sender(&self) -> Option<QuoteBroadcast> {
        self.feed.lock().clone()
    }

    /// Open a new stream. A closed slot yields an already-ended stream.
    #[must_use]
    pub fn subscribe(&self) -> QuoteStream {
        self.feed
            .lock()
            .as_ref()
            .map_or_else(|| futures::stream::empty().boxed(), QuoteBroadcast::subscribe)
    }

    /// Drop the slot's sender. Streams end once no production loop
    /// holds a clone either.
    pub fn close(&self) {
        self.feed.lock().take();
    }
}

// =============================================================================
// Tests
// =============================================================================
