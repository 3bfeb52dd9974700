//! Data layer: core types, loading, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  upload / bundled .csv / embedded sample
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse CSV → RecordTable (memoised by content)
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply Selection predicates → filtered RecordTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate │  explode / group / top-k → flat aggregate rows
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
