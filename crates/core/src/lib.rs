pub mod audit;
pub mod config;
pub mod cpq;
pub mod data;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod inference;
pub mod mapping;
pub mod session;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use config::{AppConfig, ConfigError, LoadOptions};
pub use cpq::{Catalog, CatalogResolver, Resolution, ResolvedProduct};
pub use data::{DataError, DialogData};
pub use domain::dialog::{Button, TrackerEvent, Turn, Utterance};
pub use domain::product::{Package, ProductId};
pub use domain::slots::{SlotName, SlotPatch, SlotState};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{FormDeps, FormOutcome, FormRejection, ProductForm};
pub use inference::{InferenceReport, SlotInferenceEngine};
pub use mapping::MappingTables;
pub use session::{
    Clock, InMemorySessionStore, ManualClock, SessionRecord, SessionStore, SystemClock,
};
