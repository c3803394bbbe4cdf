//! Sales gamification rules layered on the generic CRUD operations.
//!
//! Each submodule adds methods to [`Database`](crate::Database):
//! authentication, ranking points, missions and sales.

mod auth;
mod missions;
pub mod models;
mod ranking;
mod sales;

pub use auth::{AuthFailure, AuthOutcome};
pub use missions::USER_MISSIONS_FIELD;
pub use models::{
    Level, Mission, MissionProgress, NewSale, RankingWithLevel, RankingsDocument, Role, Sale,
    User, UserMission, UserProjection, UserRanking,
};
pub use ranking::resolve_level;
pub use sales::{points_for_sale, AMOUNT_PER_POINT, CROSS_SELL_MULTIPLIER};
