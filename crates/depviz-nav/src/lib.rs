//! Navigation tools for package dependency graphs.
//!
//! Provides breadth-first resolution from a package source (`resolve`),
//! forward/reverse traversal trees (`explore`), circular dependency detection
//! (`cycles`), load ordering (`order`), and DOT/Mermaid/JSON output (`export`,
//! `render`).

pub mod cycles;
pub mod explore;
pub mod export;
pub mod order;
pub mod render;
pub mod resolve;
