mod ids;
mod tier;
mod topic;

pub use ids::{ClientId, DashboardId, UserId};
pub use tier::{QuotaTable, Tier, TierLimits};
pub use topic::{Topic, USER_ACTION_TOPIC};
