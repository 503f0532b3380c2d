//! Editor core: frame rendering, command dispatch, load rules, search

/// Structural address evaluation
pub mod address;
/// Rune-indexed text buffer with undo
pub mod buffer;
/// Colors and the selection color matrix
pub mod color;
/// Command trait and registry plumbing
pub mod command;
/// Built-in verb implementations
pub mod commands;
/// RGBA drawing surface
pub mod draw;
/// Editor: tag and body frames over buffers
pub mod editor;
/// Elastic tab stops
pub mod elastic;
/// Command resolver and dispatcher
pub mod exec;
/// Glyph face abstraction (fontdue-backed)
pub mod face;
/// Text frame layout and incremental redraw
pub mod frame;
/// Subsequence fuzzy matching
pub mod fuzzy;
/// Pixel geometry
pub mod geometry;
/// Editor and column ids
pub mod id;
/// Mouse routing
pub mod input;
/// External job registry
pub mod jobs;
/// Load engine (right-click resolution)
pub mod load;
/// Concurrent file and tag search
pub mod lookfile;
/// Selections
pub mod selection;
/// Window root state
pub mod window;
