//! Core types for depviz.
//!
//! Provides the visualizer configuration ([`config::Settings`]) loaded from INI or
//! TOML files, the resolved package graph ([`graph::DependencyGraph`]), and its
//! JSON persistence.

pub mod config;
pub mod graph;
pub mod ini;
pub mod schema;
