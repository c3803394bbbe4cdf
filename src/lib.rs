//! # SwiftDB
//!
//! A small JSON collection store for a sales gamification app: users,
//! stores, rankings, missions, sales and learning tracks.
//!
//! ## Core Concepts
//!
//! - **Collections**: named JSON documents whose records sit under a field
//!   fixed by the [`Schema`]
//! - **Overrides**: modified documents persisted to a [`KeyValueStorage`];
//!   they win over the bundled originals until reset
//! - **Domain rules**: login, sale scoring, ranking levels and missions,
//!   all built from the generic CRUD operations
//!
//! ## Example
//!
//! ```ignore
//! use swiftdb::{Database, DatabaseConfig, NewSale};
//!
//! let db = Database::open(DatabaseConfig {
//!     storage_path: Some("./swift-data".into()),
//!     ..Default::default()
//! })?;
//!
//! // Authenticate
//! let outcome = db.authenticate_user("gerente@swift.com", "123456");
//!
//! // Register a sale and credit its points
//! let sale = db.register_sale(NewSale::new(2, 95.0, true))?;
//! assert_eq!(sale.points_earned, 18);
//!
//! // Back to the shipped data
//! db.reset_to_original_data(None)?;
//! ```

pub mod avatar;
pub mod collections;
pub mod database;
pub mod domain;
pub mod error;
pub mod navigation;
pub mod session;
pub mod storage;
pub mod types;
pub mod validation;

// Re-exports
pub use avatar::{AvatarRecord, AvatarStore, AvatarUpload, DEFAULT_AVATAR_URL};
pub use collections::{
    CollectionSchema, CollectionStore, DirectorySource, DocumentSource, EmbeddedSource,
    SaveOutcome, Schema, KNOWN_COLLECTIONS,
};
pub use database::{Database, DatabaseConfig};
pub use domain::{
    points_for_sale, resolve_level, AuthFailure, AuthOutcome, Level, Mission, MissionProgress,
    NewSale, RankingWithLevel, RankingsDocument, Role, Sale, User, UserMission, UserProjection,
    UserRanking,
};
pub use error::{Result, StoreError};
pub use navigation::{visible_links, NavLink};
pub use session::{redirect_for_role, AccessDecision, Page, SessionManager};
pub use storage::{FileStorage, KeyValueStorage, MemoryStorage};
pub use types::*;
pub use validation::{
    request_password_reset, validate_login, validate_recovery_email, Credentials, FieldError,
    RecoveryOutcome,
};
