//! GTP advisor (workspace facade crate).
//!
//! Re-exports the member crates under `gtp_advisor::{types,core,adapter}` so
//! embedders depend on one package while the implementation lives in
//! dedicated crates under `crates/`.

pub use gtp_advisor_adapter as adapter;
pub use gtp_advisor_core as core;
pub use gtp_advisor_types as types;
