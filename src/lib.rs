#![forbid(unsafe_code)]
//! A content-addressed probabilistic search tree with a logarithmic
//! anti-entropy diff protocol.
//!
//! Every node carries two hashes: `node_hash`, covering its own content,
//! and `merkel_hash`, folding in everything beneath it. Node boundaries
//! are content-defined (classified from `node_hash`, not from a fixed
//! fan-out), so two trees built from the same key/value set always
//! converge on the same shape no matter the insertion order. `diff`
//! exploits that: comparing two `merkel_hash`es at the root tells you in
//! one step whether two trees hold the same data, and descending only
//! where hashes disagree finds every differing key in time proportional
//! to the number of differences, not the size of either tree.
//!
//! # Conventions
//!
//! - **Errors**: fallible operations return [`error::Result`]; see
//!   [`error::TreeError`] for the complete set of failure kinds.
//! - **Logging**: use `tracing` macros (`debug!`, `trace!`); the public
//!   entry points on [`tree::Tree`] and [`diff::diff`] are `#[instrument]`-ed.
//!
//! # Modules
//!
//! - [`hash`] — the digest primitive and boundary classifier (C1).
//! - [`key`] — the tagged sort key modeling the tail sentinel as `+∞`.
//! - [`node`] — a single tree cell and the arena that owns the graph (C2).
//! - [`level`] — one height of the tree (C3).
//! - [`tree`] — the owning structure: build/search/insert/delete (C4).
//! - [`diff`] — the anti-entropy diff protocol (C5).

pub mod diff;
pub mod error;
pub mod hash;
pub mod key;
pub mod level;
pub mod node;
pub mod tree;

pub use diff::diff;
pub use error::{Result, TreeError, TreeErrorCode};
pub use hash::{Digest, Encode};
pub use tree::{NodeRef, Record, Tree};
