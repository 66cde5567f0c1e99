//! Runnable demos for `promptpipe`, one per `examples/` file. Each demo expects its
//! configuration in the environment (or a `.env` file next to the workspace root).
