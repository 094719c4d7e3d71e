#![doc = "dropsync-core: change detection and sync decisions for dropsync."]

//! This crate holds everything that decides *whether* and *which way* a file
//! should move between the local disk and the remote content store. It has no
//! network code: remote access sits behind the traits in [`contract`].
//!
//! # Usage
//! Build a [`synchronise::Synchroniser`] from a [`config::SyncOptions`] and
//! collaborator implementations, then `run` it over a list of pairs.

pub mod config;
pub mod contract;
pub mod decide;
pub mod error;
pub mod fingerprint;
pub mod probe;
pub mod synchronise;
pub mod timestamp;
