pub mod evaluation;
pub mod hash;
pub mod media;
pub mod record;
pub mod stage;
pub mod summary;
pub mod team;

pub use evaluation::{EvaluationData, StageEvaluation};
pub use media::{MediaCounts, MediaItem, MediaKind};
pub use record::{ActivityRecord, Advance, QuotaProgress, RecordError, RemovedMedia, StageRecord};
pub use stage::{ALL_STAGES, Stage, StageRequirements, ordered_stages};
pub use summary::SummaryData;
pub use team::{DivisionRole, TeamDivision, TeamInfo};

#[cfg(any(test, feature = "testing"))]
pub mod testing;
