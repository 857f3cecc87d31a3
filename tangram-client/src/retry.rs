//! Retry policies for flood waits, transient server errors and I/O hiccups.

use std::num::NonZeroU32;
use std::ops::ControlFlow;
use std::time::Duration;

use crate::errors::InvocationError;

/// Re-issues per query across all retryable causes. Chosen here because the
/// protocol itself specifies none; after this the error surfaces.
pub const MAX_ATTEMPTS: u32 = 5;

/// Controls how the client reacts when an RPC call fails.
pub trait RetryPolicy: Send + Sync + 'static {
    /// `Continue(delay)` sleeps and re-issues; `Break` surfaces the error.
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration>;
}

/// Context passed to [`RetryPolicy::should_retry`] on each failure.
pub struct RetryContext {
    /// 1 on the first failure.
    pub fail_count: NonZeroU32,
    /// Total time already spent sleeping for this request.
    pub slept_so_far: Duration,
    /// The error that triggered this decision.
    pub error: InvocationError,
}

/// Never retry.
pub struct NoRetries;

impl RetryPolicy for NoRetries {
    fn should_retry(&self, _: &RetryContext) -> ControlFlow<(), Duration> {
        ControlFlow::Break(())
    }
}

/// Default policy: honor short flood waits, delay transient 500s, retry I/O
/// errors once after a second. Everything is bounded by [`MAX_ATTEMPTS`].
pub struct AutoSleep {
    /// Flood waits longer than this surface to the caller instead.
    pub flood_threshold: Duration,
    /// Base delay for 500-class errors.
    pub transient_delay: Duration,
}

impl Default for AutoSleep {
    fn default() -> Self {
        Self {
            flood_threshold: Duration::from_secs(60),
            transient_delay: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy for AutoSleep {
    fn should_retry(&self, ctx: &RetryContext) -> ControlFlow<(), Duration> {
        if ctx.fail_count.get() >= MAX_ATTEMPTS {
            return ControlFlow::Break(());
        }

        if let Some(secs) = ctx.error.flood_wait_seconds() {
            if secs <= self.flood_threshold.as_secs() {
                tracing::info!("FLOOD_WAIT_{secs} — sleeping before retry");
                return ControlFlow::Continue(Duration::from_secs(secs));
            }
            return ControlFlow::Break(());
        }

        if let InvocationError::Rpc(e) = &ctx.error {
            if e.is_transient() {
                let jitter = Duration::from_millis(jitter_ms());
                tracing::info!("server error {} — retrying in ~{:?}", e.code, self.transient_delay);
                return ControlFlow::Continue(self.transient_delay + jitter);
            }
        }

        if matches!(ctx.error, InvocationError::Io(_) | InvocationError::Dropped) {
            tracing::info!("transport error — retrying in 1s");
            return ControlFlow::Continue(Duration::from_secs(1));
        }

        ControlFlow::Break(())
    }
}

fn jitter_ms() -> u64 {
    let mut b = [0u8; 2];
    let _ = getrandom::getrandom(&mut b);
    // 0..2048 ms on top of the base delay
    u64::from(u16::from_le_bytes(b) & 0x7ff)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::RpcError;

    fn ctx(error: InvocationError, fails: u32) -> RetryContext {
        RetryContext {
            fail_count: NonZeroU32::new(fails).unwrap(),
            slept_so_far: Duration::ZERO,
            error,
        }
    }

    #[test]
    fn flood_wait_sleeps_exact_seconds() {
        let p = AutoSleep::default();
        let e = InvocationError::Rpc(RpcError::from_server(420, "FLOOD_WAIT_3"));
        match p.should_retry(&ctx(e, 1)) {
            ControlFlow::Continue(d) => assert_eq!(d, Duration::from_secs(3)),
            ControlFlow::Break(()) => panic!("short flood wait must retry"),
        }
    }

    #[test]
    fn long_flood_wait_surfaces() {
        let p = AutoSleep::default();
        let e = InvocationError::Rpc(RpcError::from_server(420, "FLOOD_WAIT_86400"));
        assert!(matches!(p.should_retry(&ctx(e, 1)), ControlFlow::Break(())));
    }

    #[test]
    fn transient_retries_with_base_delay() {
        let p = AutoSleep::default();
        let e = InvocationError::Rpc(RpcError::from_server(500, "INTERDC_CALL_ERROR"));
        match p.should_retry(&ctx(e, 2)) {
            ControlFlow::Continue(d) => assert!(d >= Duration::from_secs(10)),
            ControlFlow::Break(()) => panic!("500 must retry"),
        }
    }

    #[test]
    fn budget_is_bounded() {
        let p = AutoSleep::default();
        let e = InvocationError::Rpc(RpcError::from_server(500, "INTERDC_CALL_ERROR"));
        assert!(matches!(p.should_retry(&ctx(e, MAX_ATTEMPTS)), ControlFlow::Break(())));
    }

    #[test]
    fn terminal_never_retries() {
        let p = AutoSleep::default();
        let e = InvocationError::Rpc(RpcError::from_server(400, "PEER_ID_INVALID"));
        assert!(matches!(p.should_retry(&ctx(e, 1)), ControlFlow::Break(())));
    }
}
