//! Retrying, concurrent quote fetching into a [`QuoteBook`].
//!
//! Uses Semaphore + JoinSet + mpsc for bounded concurrent fetching. Each
//! request is retried with exponential backoff while the failure looks
//! transient (throttling, network errors, 5xx).

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use ltcg_quotes::{Client, Error, ExchangeSymbol};
use rand::Rng;
use rust_decimal::Decimal;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;
use tokio::time::sleep;

use crate::config::QuoteSettings;
use crate::market_price::QuoteBook;
use crate::symbol_alias::SymbolAliases;

/// Longest single wait between two attempts, jitter excluded.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// Execute an async operation with exponential backoff on transient errors.
///
/// Waits `base_backoff * 2^attempt` (capped at [`MAX_BACKOFF`]) plus up to
/// half of `base_backoff` of jitter between attempts, for at most
/// `max_retries` retries. Errors that are not transient are returned
/// immediately.
pub async fn with_retry<F, Fut, T>(
    max_retries: u32,
    base_backoff: Duration,
    operation: F,
) -> Result<T, Error>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, Error>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(val) => return Ok(val),
            Err(e) if e.is_transient() && attempt < max_retries => {
                let backoff = base_backoff
                    .checked_mul(1u32 << attempt.min(16))
                    .map_or(MAX_BACKOFF, |b| b.min(MAX_BACKOFF));
                let jitter_cap = (base_backoff.min(MAX_BACKOFF).as_millis() as u64) / 2;
                let jitter = Duration::from_millis(rand::thread_rng().gen_range(0..=jitter_cap));
                tracing::debug!(
                    "Attempt {} failed ({}), retrying in {:?}",
                    attempt + 1,
                    e,
                    backoff + jitter
                );
                sleep(backoff + jitter).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

struct QuoteResult {
    symbol: String,
    result: Result<Decimal, Error>,
}

/// Fetch current prices for `symbols` and collect them in a [`QuoteBook`].
///
/// Prices are stored under the symbol as given (the ledger symbol), even when
/// the request goes out under a renamed code. Failures are recorded in the
/// book rather than returned. `on_fetched` is called once per symbol with
/// whether its fetch succeeded.
pub async fn fetch_quote_book<P>(
    client: Arc<Client>,
    symbols: &[String],
    aliases: &SymbolAliases,
    settings: &QuoteSettings,
    mut on_fetched: P,
) -> QuoteBook
where
    P: FnMut(&str, bool),
{
    let book = QuoteBook::new();
    let concurrency = settings.concurrency.max(1);
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let (tx, mut rx) = mpsc::channel::<QuoteResult>(concurrency * 2);
    let mut join_set = JoinSet::new();

    for symbol in symbols {
        let quote_symbol = aliases.quote_symbol(symbol);
        let target: ExchangeSymbol = match quote_symbol.parse() {
            Ok(target) => target,
            Err(e) => {
                tracing::warn!("{}: {}", symbol, e);
                book.record_failure(symbol.clone(), e.to_string());
                on_fetched(symbol, false);
                continue;
            }
        };
        if quote_symbol != *symbol {
            tracing::debug!("{} quoted as {}", symbol, quote_symbol);
        }

        let sem = Arc::clone(&semaphore);
        let sender = tx.clone();
        let client = Arc::clone(&client);
        let symbol = symbol.clone();
        let max_retries = settings.max_retries;
        let base_backoff = settings.base_backoff();

        join_set.spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = with_retry(max_retries, base_backoff, || {
                let client = Arc::clone(&client);
                let target = target.clone();
                async move { client.get_quote(&target).await.map(|q| q.price) }
            })
            .await;
            let _ = sender.send(QuoteResult { symbol, result }).await;
        });
    }
    drop(tx);

    while let Some(fetch) = rx.recv().await {
        match fetch.result {
            Ok(price) => {
                book.insert(fetch.symbol.clone(), price);
                on_fetched(&fetch.symbol, true);
            }
            Err(e) => {
                tracing::warn!("{}: quote fetch failed: {}", fetch.symbol, e);
                book.record_failure(fetch.symbol.clone(), e.to_string());
                on_fetched(&fetch.symbol, false);
            }
        }
    }
    while join_set.join_next().await.is_some() {}

    tracing::info!(
        "Fetched {} quote(s), {} failure(s)",
        book.len(),
        book.failures().len()
    );
    book
}
