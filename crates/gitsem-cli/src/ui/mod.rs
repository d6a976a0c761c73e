//! # CLI UI Module
//!
//! Styling and formatting layer for gitsem CLI output.
//!
//! ## Design Principles
//!
//! 1. **Scannable**: success or failure is visible from the prefix alone
//! 2. **Consistent**: same prefixes and tables across all commands
//! 3. **Accessible**: works without colors (respects `NO_COLOR`)
//! 4. **Scriptable**: listings accept `--json`
//!
//! ## Module Structure
//!
//! - `color`: Color mode detection and terminal capability checks
//! - `style`: Message types, prefixes, and styling functions
//! - `format`: Small text formatters (truncation, plurals, line stats)
//! - `table`: Table rendering with comfy-table

pub mod color;
pub mod format;
pub mod style;
pub mod table;

pub use color::ColorMode;
pub use style::{MessageType, Style};
