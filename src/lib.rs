//! # class-resolver
//!
//! Classpath resolution for bytecode-processing tools: given a class name,
//! produce its binary representation from directory trees, jar mounts, or
//! injected overrides, with deterministic precedence and per-provider caching.
//!
//! ## Architecture
//!
//! - **provider**: The `ClassProvider` lookup trait and diagnostic sink
//! - **name**: Class name normalization and path derivation helpers
//! - **info**: Class bytes with a lazily parsed structural view
//! - **mount**: A jar/zip file mounted as a virtual directory tree
//! - **index**: Package-to-root index built lazily over library roots
//! - **builder**: Configuration surface producing a resolving provider
//! - **resolve**: Override-then-index leaf provider with result caching
//! - **composite**: Ordered first-match-wins aggregation of providers

pub mod builder;
pub mod composite;
pub mod index;
pub mod info;
pub mod mount;
pub mod name;
pub mod provider;
pub mod resolve;
