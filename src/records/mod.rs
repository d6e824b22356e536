//! @ai:module:intent Typed records flowing through the engine
//! @ai:module:layer domain
//! @ai:module:public_api PrRecord, DerivedPr, SizeClass, TeamMapping, TeamTable, SummaryRecord, SummaryTable

pub mod pr;
pub mod summary;
pub mod team;

pub use pr::{DerivedPr, PrRecord, SizeClass};
pub use summary::{SummaryRecord, SummaryTable};
pub use team::{TeamMapping, TeamTable};
