// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    output_path, resolve_start_url, summary_line, title_to_url, trace_for, walk_options_from_args,
};

// Re-export walk functionality from firstlink-core
pub use firstlink_core::walk::{
    execute_walk, stderr_trace, stdout_trace, Outcome, PathFinder, TraceCallback, Walk, WalkOptions,
};
