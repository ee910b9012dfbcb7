//! Process supervision.
//!
//! Each command runs under a [`ProcessWorker`], which owns the subprocess and
//! a dedicated tokio task multiplexing its pipes.
//!
//! # Architecture
//!
//! ```text
//!  consumer                 ProcessWorker task                  sh -c
//! ┌──────────┐  write   ┌────────────┐               ┌───────────────────┐
//! │          │─────────▶│ InputQueue │──stdin───────▶│                   │
//! │          │          ├────────────┤               │  own process      │
//! │          │◀─────────│OutputBuffer│◀──stdout+err──│  group            │
//! └──────────┘  drain   └────────────┘               └───────────────────┘
//! ```
//!
//! The shell's stderr is merged into stdout, so output arrives on one pipe
//! in the order it was written. Signals go to the whole process group.

mod input;
mod io;
pub mod signal;
mod spawn;
mod worker;

pub use input::{InputQueue, PendingInput, END_OF_INPUT};
pub use io::{InputWriter, OutputReader, ReadOutcome};
pub use signal::Signal;
pub use worker::{ProcessWorker, WorkerState};
