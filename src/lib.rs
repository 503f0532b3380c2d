//! limn: the core of a programmable text editor
//!
//! Three tightly coupled subsystems: a glyph [`frame`](core::frame) that
//! renders styled runes with softwrap, tab stops, tick and selection
//! semantics under aggressive incremental redraw; a command
//! [`dispatcher`](core::exec) that resolves typed or clicked text into
//! built-in verbs, spawned jobs, or [`load`](core::load)-rule targets;
//! and the [`LookFile`](core::lookfile) searcher, a cooperative
//! multi-producer fuzzy search over the filesystem and a tag index.

pub mod config;
pub mod core;
