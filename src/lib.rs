//! # promptpipe
//!
//! Chain-centric framework for composing LLM pipelines in Rust
//!
//! ## Usage
//! Add a dependency in `Cargo.toml`
//! ```toml
//! promptpipe = { git = "https://github.com/promptpipe/promptpipe.git", branch = "main" }
//! ```
//!
//! ## Why `promptpipe`
//!
//! Because an LLM application is rarely more than a handful of calls glued together, and
//! that glue deserves to be declarative. You should be able to read a pipeline top to
//! bottom and see exactly what flows where, without chasing callbacks or inheritance
//! hierarchies.
//!
//! ## Concepts and Design
//! `promptpipe` follows data-driven design. A pipeline is an expression built from small
//! parts with one composition operator; evaluation is a single walk over that expression.
//! Cycle speed is NOT a top priority since an LLM can take trillions of cycles to respond
//! to a request.
//!
//! ### Stage
//!
//! The atomic unit of computation: fill a template, invoke a model, parse an output, or
//! run a plain function. A stage consumes one JSON value and produces one JSON value, or
//! fails. Built-in stages live in [stage]; anything implementing
//! [Stage](crate::chain::Stage) composes the same way.
//!
//! ### Sequence
//!
//! Stages chain left to right with `|`:
//!
//! ```text
//! template | model | parser
//! ```
//!
//! The output of each stage feeds the next. Composition flattens, so grouping never
//! matters. The first failing stage aborts the rest.
//!
//! ### Fan-out
//!
//! A fan-out maps names to independent branches. Every branch sees the same input; the
//! results merge into one JSON object keyed by branch name:
//!
//! ```text
//! {translate: template | model | parser} | summary_template | model | parser
//! ```
//!
//! If any branch fails, the whole fan-out fails and nothing is merged.
//!
//! ### Pipeline
//!
//! A [Pipeline](crate::chain::Pipeline) wraps the composed graph behind one `evaluate`
//! call. Build once, evaluate as often as you like; calls are independent and nothing is
//! cached.
//!
//! ### Endpoint or LLM
//!
//! The endpoint of a chain is usually an LLM stage wrapping a chat completion client.
//! Post-processing of the reply lives in [utilities](crate::utils), and of course the
//! output of one pipeline can be the input of another.
//!
//! ## License
//!
//! `promptpipe` will always remain free under Apache license.

pub mod chain;
pub mod config;
pub mod prompt;
pub mod stage;
pub mod utils;
