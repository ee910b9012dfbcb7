//! Output capture: line framing and per-process buffering.
//!
//! ```text
//!  pipe bytes ──▶ LineFramer ──▶ complete lines ──▶ OutputBuffer::append_lines
//!                     │
//!                     └────────▶ partial tail ───▶ OutputBuffer::set_remainder
//!
//!  consumer ◀── OutputBuffer::drain ── (remainder_active, remainder_changed, lines)
//! ```

mod buffer;
mod framer;

pub use buffer::{Drained, OutputBuffer};
pub use framer::{strip_ansi, Framed, LineFramer};
