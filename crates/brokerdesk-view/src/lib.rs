//! # brokerdesk-view
//!
//! The list-filter-detail-action pattern shared by the lead pipeline,
//! business listings, agent directory, and notification inbox:
//!
//! - [`CollectionStore`]: ordered read-through cache of one collection
//! - [`filter`]: pure filtering and sorting over store snapshots
//! - [`SelectionController`]: selected entity plus its derived score
//! - [`ActionDispatcher`]: optimistic favorites, mark-read, and delete
//! - [`Session`]: explicit auth context passed to everything above
//!
//! Form-driven creation lives in [`intake`] and [`inquiry`]; recoverable
//! failures surface on the [`NoticeBoard`].

pub mod dispatch;
pub mod favorites;
pub mod filter;
pub mod inquiry;
pub mod intake;
pub mod notice;
pub mod scoring;
pub mod selection;
pub mod session;
pub mod store;
pub mod summary;

pub use dispatch::{ActionDispatcher, MutationState};
pub use favorites::FavoriteSet;
pub use filter::{Constraint, FilterCriteria, apply, sort_records};
pub use inquiry::InquiryService;
pub use intake::{LeadIntake, ListingIntake};
pub use notice::{Notice, NoticeBoard};
pub use scoring::{LeadScoring, ListingScoring, ScoringStrategy};
pub use selection::{SelectionController, SelectionState};
pub use session::Session;
pub use store::{CollectionStore, Placement, StoreChange};
pub use summary::PipelineSummary;
