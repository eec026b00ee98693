//! # stitchflow
//!
//! Embroidery design workflow: sort downloaded designs into owner buckets,
//! export every garment face as a machine stitch file under a short coded
//! name, and stamp those names onto the matching order labels.
//!
//! # Architecture: Three Passes
//!
//! Each pass reads what the previous one left in `sorted/output/` and can be
//! re-run at any time:
//!
//! ```text
//! 1. Classify  files/design/  →  identity.json + classification.json + sorted/<owner>/pes/
//! 2. Export    classification →  sorted/<owner>/dst/ + export_registry.jsonl
//! 3. Label     files/labels/  →  sorted/<owner>/labels/ (stamped)
//! ```
//!
//! A design is identified by the content of its face files, not by its order
//! or file names. The same design downloaded again under a new order keeps
//! its owner and folder order, and is never exported twice.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`scan`] | walks the design directory, parses order-system file names |
//! | [`faces`] | resolves a scanned item into its ordered faces |
//! | [`fingerprint`] | SHA-256 content fingerprints of designs |
//! | [`identity`] | the identity ledger: fingerprint → owner bucket + folder order |
//! | [`workload`] | balances new designs across owners by estimated stitch time |
//! | [`classify`] | pass 1: identities and the sorted tree |
//! | [`naming`] | the nine-character export name format, both directions |
//! | [`registry`] | append-only log of every exported face |
//! | [`export`] | pass 2: conversion and registration |
//! | [`labels`] | pass 3: composes label text from the registry and stamps it |
//! | [`stitch`] | converter seam, DST header stats, stitch time estimates |
//! | [`imaging`] | raster label stamping on the `image` crate |
//! | [`check`] | item and face completeness of the download directories |
//! | [`config`] | `stitchflow.toml` loading, merging over stock defaults, validation |
//! | [`report`] | per-pass outcome collection |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## The Registry Is the Only Bridge to Labels
//!
//! The label pass never guesses a name from a file name. It walks label
//! image → item id → fingerprint (ledger) → registry records, and stamps
//! only what the registry says was exported. A design whose export was
//! interrupted is left unlabelled until a later export run completes it.
//!
//! ## One Writer per File
//!
//! The identity ledger is written only by the classify pass, through
//! `&mut` access, so folder orders cannot be handed out twice. The registry
//! is written only by the export pass, behind a `Mutex` shared by the rayon
//! workers; every record is synced to disk before the next one is written.
//!
//! ## Names Are a Contract
//!
//! Export names end up on paper labels and machine screens. Everything that
//! knows their layout lives in [`naming`], and the registry header stores
//! the scheme it was written with, so a changed month alphabet or single
//! code is caught on load instead of producing names that decode wrongly.

pub mod check;
pub mod classify;
pub mod config;
pub mod export;
pub mod faces;
pub mod fingerprint;
pub mod identity;
pub mod imaging;
pub mod labels;
pub mod naming;
pub mod output;
pub mod registry;
pub mod report;
pub mod scan;
pub mod stitch;
pub mod transfer;
pub mod types;
pub mod workload;

#[cfg(test)]
pub(crate) mod test_helpers;
