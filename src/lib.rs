//! # opsdesk
//!
//! Self-hosted autonomous back-office: a crew of task agents driven by an
//! LLM command interpreter, working per-client JSON queues on disk.
//!
//! This library provides:
//! - A command interpreter turning free text into structured, routed tasks
//! - A per-client file-backed task queue and conversation memory
//! - A static agent registry with conformance scoring
//! - A dispatch loop draining every agent's queue each pass
//! - An HTTP API for commands and insights
//!
//! ## Task Flow
//! 1. Receive a command via API (or the dispatch loop finds queued work)
//! 2. The interpreter maps it to an agent, a task kind, and a priority
//! 3. The task lands in that agent's per-client queue
//! 4. Each dispatch pass snapshots a queue, runs its tasks, logs outcomes
//!
//! ## Modules
//! - `agents`: the built-in crew and the `Agent` trait
//! - `interpreter`: LLM-backed command interpretation
//! - `registry`: conformance scoring and agent lookup
//! - `dispatch`: the per-client dispatch loop
//! - `store`: client documents, memory, and the task queue
//! - `api`: HTTP surface

pub mod agents;
pub mod api;
pub mod config;
pub mod dispatch;
pub mod interpreter;
pub mod llm;
pub mod metrics;
pub mod registry;
pub mod store;
pub mod task;

pub use config::Config;
pub use dispatch::Dispatcher;
pub use interpreter::CommandInterpreter;
pub use metrics::Metrics;
pub use task::{Priority, Task, TaskKind};
