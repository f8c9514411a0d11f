//! Internal diagnostic channel (spec.md §4.B, §6, §7).
//!
//! Runtime step failures, queue overflows, and worker restarts are never
//! surfaced to the caller; they are reported here. Grounded in
//! `log_impl.rs::backup_logging`'s "write to stderr, never propagate"
//! discipline.
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

/// The environment variable spec.md §6 names for enabling verbose internal
/// tracing. Truthy values are `true`, `1`, `yes` (case-insensitive).
pub const DEBUG_ENV_VAR: &str = "LUAL_INTERNAL_DEBUG";

static DEGRADED_NOTICE_SENT: AtomicBool = AtomicBool::new(false);

fn truthy(value: &str) -> bool {
    matches!(value.to_ascii_lowercase().as_str(), "true" | "1" | "yes")
}

/// Whether verbose internal diagnostics are enabled via
/// [`DEBUG_ENV_VAR`].
pub fn is_debug_enabled() -> bool {
    std::env::var(DEBUG_ENV_VAR).map(|v| truthy(&v)).unwrap_or(false)
}

/// Reports a runtime failure (transformer/presenter/output/async) to the
/// standard error stream. Always emitted, regardless of
/// [`is_debug_enabled`] — this is the unconditional diagnostic channel
/// spec.md §7 requires for isolated step failures.
pub fn report_error(context: &str, detail: &str) {
    let _ = writeln!(std::io::stderr(), "[grove] {} error: {}", context, detail);
}

/// Emits a verbose internal trace line, gated by [`DEBUG_ENV_VAR`] and
/// prefixed per spec.md §6.
pub fn debug_trace(msg: &str) {
    if is_debug_enabled() {
        let _ = writeln!(std::io::stderr(), "[LUAL_DEBUG] {}", msg);
    }
}

/// Reports the one-time notice that the async writer degraded to
/// synchronous dispatch after exhausting its restart budget (spec.md §7).
pub fn report_degraded_once() {
    if !DEGRADED_NOTICE_SENT.swap(true, Ordering::SeqCst) {
        report_error("async writer", "restart limit exhausted; falling back to synchronous dispatch");
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn truthy_values_are_case_insensitive() {
        assert!(truthy("TRUE"));
        assert!(truthy("Yes"));
        assert!(truthy("1"));
        assert!(!truthy("0"));
        assert!(!truthy("nope"));
    }
}
