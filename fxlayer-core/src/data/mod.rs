//! Rate snapshots and the raw / silver / gold layers on disk.

pub mod exchangerate;
pub mod normalize;
pub mod provider;
pub mod rebase;
pub mod schema;
pub mod snapshot;
pub mod store;

pub use exchangerate::ExchangeRateApi;
pub use normalize::{normalize, normalize_payload, DropReason, Normalized, NormalizedRecord};
pub use provider::{FetchMode, ProviderError, RateProvider};
pub use rebase::{rebase, RebaseError, RebasedRecord};
pub use schema::{GoldSchema, SchemaError, SilverSchema};
pub use snapshot::{PayloadShape, RawSnapshot, SnapshotError};
pub use store::{ArtifactKind, ArtifactStore, StoreError, SummaryFormat, DATE_FORMAT};
