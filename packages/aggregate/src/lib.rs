#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Merging and summarization of normalized displacement records.
//!
//! Everything in this crate is a pure function over already-normalized
//! domain records: no I/O, no errors. The three concerns are flow merging
//! (UNHCR plus UNRWA, additive by origin/asylum pair), IDP yearly
//! selection (one figure per country-year under an operation-priority
//! policy), and conflict summarization (per-country event statistics).

pub mod conflict;
pub mod idp;
pub mod merge;

pub use conflict::summarize;
pub use idp::{aggregate_by_year, aggregate_country};
pub use merge::merge_flows;
