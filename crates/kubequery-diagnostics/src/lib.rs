//! Diagnostic filters for kubequery
//!
//! Derived views computed client-side from full listings: a filter lists the
//! underlying collection, applies its predicate in a single pass, and returns
//! a reduced report. All filters are read-only and stateless between calls.

mod capacity;
mod orphans;
mod pods;

pub use capacity::{format_bytes, node_capacity, parse_cpu, parse_memory};
pub use orphans::{is_orphaned, orphaned_resources};
pub use pods::{
    DEFAULT_RESTART_THRESHOLD, failed_pods, high_restart_pods, is_failed, max_restart_count,
    pending_pods, validate_threshold,
};
