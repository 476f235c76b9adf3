use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::{
    db::{Caller, DbClient, Filter},
    middlewares::auth::AuthContext,
    models::{
        achievement::{
            AchievementRow, Achievements, AchievementsOverview, CreateAchievementRequest,
            UserAchievementInsert, UserAchievementRow, UserAchievements,
        },
        profile::Profiles,
    },
};

pub struct AchievementService {
    db: DbClient,
}

impl AchievementService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    /// Catalog, the caller's earned badges, and their point total.
    pub async fn overview(&self, ctx: &AuthContext) -> ServiceResult<AchievementsOverview> {
        let caller = ctx.caller();
        let catalog = self
            .db
            .from::<Achievements>()
            .select(&caller, &Filter::new().order("points", true))
            .await?;
        let earned = self.earned_by(&caller, ctx.user.id).await?;
        Ok(AchievementsOverview::new(catalog, earned))
    }

    async fn earned_by(&self, caller: &Caller, user_id: Uuid) -> ServiceResult<Vec<UserAchievementRow>> {
        Ok(self
            .db
            .from::<UserAchievements>()
            .select(
                caller,
                &Filter::new()
                    .eq("user_id", user_id)
                    .order("earned_at", false),
            )
            .await?)
    }

    pub async fn create(
        &self,
        ctx: &AuthContext,
        req: CreateAchievementRequest,
    ) -> ServiceResult<AchievementRow> {
        let achievement = self
            .db
            .from::<Achievements>()
            .insert(&ctx.caller(), &req.into())
            .await?;
        tracing::info!(achievement_id = %achievement.id, "Achievement created");
        Ok(achievement)
    }

    /// Awards a badge once; a second grant is a conflict.
    pub async fn grant(
        &self,
        ctx: &AuthContext,
        user_id: Uuid,
        achievement_id: Uuid,
    ) -> ServiceResult<UserAchievementRow> {
        let caller = ctx.caller();

        if self
            .db
            .from::<Profiles>()
            .select_one(&caller, Filter::new().eq("id", user_id))
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!("Profile {} not found", user_id)));
        }
        if self
            .db
            .from::<Achievements>()
            .select_one(&caller, Filter::new().eq("id", achievement_id))
            .await?
            .is_none()
        {
            return Err(ServiceError::NotFound(format!(
                "Achievement {} not found",
                achievement_id
            )));
        }

        let already = self
            .db
            .from::<UserAchievements>()
            .count(
                &caller,
                &Filter::new()
                    .eq("user_id", user_id)
                    .eq("achievement_id", achievement_id),
            )
            .await?;
        if already > 0 {
            return Err(ServiceError::Conflict(
                "Achievement already granted to this user".to_string(),
            ));
        }

        let record = self
            .db
            .from::<UserAchievements>()
            .insert(
                &caller,
                &UserAchievementInsert {
                    user_id,
                    achievement_id,
                    id: None,
                    earned_at: None,
                },
            )
            .await?;
        tracing::info!(admin_id = %ctx.user.id, %user_id, %achievement_id, "Achievement granted");
        Ok(record)
    }
}
