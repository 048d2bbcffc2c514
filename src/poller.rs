//! Submit-then-poll orchestration.
//!
//! The first document is built from the caller's context as-is. While the
//! vendor reports a non-terminal status the poller keeps sending status
//! queries for the returned order id, sleeping between them, until a terminal
//! status arrives, the query budget runs out, or the abort signal is raised.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::PollingConfig;
use crate::error::{CreditError, Result};
use crate::http_client::Transport;
use crate::request::RequestContext;
use crate::resolver::ResponseResolver;
use crate::serializer;

/// Terminal response and how many status queries it took
#[derive(Debug)]
pub struct PollOutcome {
    pub resolver: ResponseResolver,
    pub response: String,
    pub status_queries: u32,
}

/// Cancellation flag that also wakes a poller sleeping between queries
#[derive(Debug, Default)]
pub struct AbortSignal {
    raised: AtomicBool,
    notify: Notify,
}

impl AbortSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    /// Resolves once [`raise`](Self::raise) has been called
    pub async fn raised(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_raised() {
                return;
            }
            notified.await;
        }
    }
}

pub struct Poller<T: Transport> {
    transport: T,
    interval: Duration,
    max_attempts: u32,
    abort: Arc<AbortSignal>,
}

impl<T: Transport> Poller<T> {
    pub fn new(transport: T) -> Self {
        Self::from_config(transport, &PollingConfig::default())
    }

    pub fn from_config(transport: T, config: &PollingConfig) -> Self {
        Self {
            transport,
            interval: Duration::from_secs(config.interval_seconds),
            max_attempts: config.max_attempts,
            abort: Arc::new(AbortSignal::new()),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Share an existing abort signal, e.g. one raised by a signal handler
    pub fn with_abort_signal(mut self, abort: Arc<AbortSignal>) -> Self {
        self.abort = abort;
        self
    }

    /// Signal that stops the poller before its next request once raised
    pub fn abort_handle(&self) -> Arc<AbortSignal> {
        Arc::clone(&self.abort)
    }

    pub async fn run(&self, ctx: &RequestContext) -> Result<PollOutcome> {
        self.check_abort()?;

        let (resolver, response) = self.exchange(ctx).await?;
        if resolver.status().is_terminal() {
            return Ok(PollOutcome {
                resolver,
                response,
                status_queries: 0,
            });
        }

        let order_id = resolver
            .vendor_order_id()
            .or(ctx.vendor_order_id.as_deref())
            .ok_or_else(|| {
                CreditError::malformed("non-terminal response carries no vendor order identifier")
            })?
            .to_string();
        info!(
            vendor_order_id = %order_id,
            status = %resolver.status().code,
            "Order accepted, polling for completion"
        );

        let query = ctx.status_query(&order_id);
        let mut status_queries = 0;

        loop {
            if status_queries >= self.max_attempts {
                warn!(vendor_order_id = %order_id, attempts = status_queries, "Giving up on order");
                return Err(CreditError::PollTimeout {
                    attempts: status_queries,
                });
            }

            self.check_abort()?;
            tokio::select! {
                _ = sleep(self.interval) => {}
                _ = self.abort.raised() => {
                    info!(vendor_order_id = %order_id, "Polling aborted");
                    return Err(CreditError::Aborted);
                }
            }

            status_queries += 1;
            let (resolver, response) = self.exchange(&query).await?;
            debug!(
                vendor_order_id = %order_id,
                attempt = status_queries,
                status = %resolver.status().code,
                "Status query answered"
            );

            if resolver.status().is_terminal() {
                info!(
                    vendor_order_id = %order_id,
                    status = %resolver.status().code,
                    status_queries,
                    "Order reached terminal status"
                );
                return Ok(PollOutcome {
                    resolver,
                    response,
                    status_queries,
                });
            }
        }
    }

    async fn exchange(&self, ctx: &RequestContext) -> Result<(ResponseResolver, String)> {
        let document = serializer::serialize(ctx)?;
        let response = self.transport.submit(&document).await?;
        let resolver = ResponseResolver::load(&response)?;
        Ok((resolver, response))
    }

    fn check_abort(&self) -> Result<()> {
        if self.abort.is_raised() {
            return Err(CreditError::Aborted);
        }
        Ok(())
    }
}
