//! Snapshot, replay, copy, scaffold and remove directory trees through a
//! pluggable storage backend.
//!
//! A walk first captures a [`tree::TreeNode`] of names and kinds, then
//! replays it to drive writes, so an unreadable source fails before any
//! destination is touched.

#![allow(clippy::enum_variant_names)]

pub mod application;
pub mod backend;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod error;
pub mod ext;
pub mod tree;
