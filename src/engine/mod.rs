// SPDX-License-Identifier: Apache-2.0

//! Query engine
//!
//! Safety gate, row cursors, result shaping and the PostgreSQL driver.

pub mod cursor;
pub mod drivers;
pub mod error;
pub mod safety;
pub mod shaper;
pub mod traits;
pub mod types;

pub use error::{EngineError, EngineResult, ErrorResponse};
pub use safety::{validate_read_only, SafetyViolation};
pub use traits::{ExportSink, QueryEngine};
pub use types::{clamp_limit, QueryResult, Value};
