//! # Repository Module
//!
//! Database repository implementations for the fiscal core.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  factura-fiscal service                                                │
//! │       │                                                                 │
//! │       │  db.sequences().allocate(&org, &document_type_id)              │
//! │       ▼                                                                 │
//! │  SequenceRepository                                                    │
//! │  ├── allocate / allocate_from_sequence   (atomic counter)              │
//! │  ├── insert / update / reset / delete    (transaction + audit row)     │
//! │  └── get / list / find_active / audit_log                              │
//! │       │                                                                 │
//! │       │  SQL Query (always filtered by organization_id)                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`OrganizationRepository`](organization::OrganizationRepository) - Tenants and roles
//! - [`DocumentTypeRepository`](document_type::DocumentTypeRepository) - Document type catalogue
//! - [`SequenceRepository`](sequence::SequenceRepository) - Sequences, counter, audit
//! - [`DocumentRepository`](document::DocumentRepository) - Issued documents

pub mod document;
pub mod document_type;
pub mod organization;
pub mod sequence;
