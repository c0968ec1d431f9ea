//! # factura-db: Database Layer for the FacturaSaaS Fiscal Core
//!
//! SQLite storage through sqlx: pool, migrations, repositories, and the
//! atomic increment-and-return that makes fiscal numbers unique.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fiscal Numbering Data Flow                       │
//! │                                                                         │
//! │  factura-fiscal (SequenceAllocator::allocate)                          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    factura-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │  │   │
//! │  │   │               │    │ SequenceRepo   │    │ 001_initial  │  │   │
//! │  │   │ SqlitePool    │◄───│ DocTypeRepo    │    │  _schema.sql │  │   │
//! │  │   │ WAL + busy    │    │ DocumentRepo   │    │              │  │   │
//! │  │   │ timeout       │    │ OrgRepo        │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (one per deployment, tenant column per row)      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use factura_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("factura.db")).await?;
//! let row = db.sequences().allocate(&org_id, &document_type_id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

pub use repository::document::DocumentRepository;
pub use repository::document_type::DocumentTypeRepository;
pub use repository::organization::OrganizationRepository;
pub use repository::sequence::{AllocationRow, ResetOutcome, SequenceRepository};
