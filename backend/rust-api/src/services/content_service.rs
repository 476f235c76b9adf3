use chrono::Utc;
use uuid::Uuid;

use super::{ServiceError, ServiceResult};
use crate::{
    db::{DbClient, Filter},
    middlewares::auth::AuthContext,
    models::{
        emergency_procedure::{
            CreateProcedureRequest, EmergencyProcedureRow, EmergencyProcedureUpdate,
            EmergencyProcedures, ListProceduresQuery, UpdateProcedureRequest,
        },
        learning_module::{
            CreateModuleRequest, LearningModuleRow, LearningModuleUpdate, LearningModules,
            ListModulesQuery, ModuleDetail, UpdateModuleRequest,
        },
        quiz_question::{CreateQuestionRequest, QuizQuestionRow, QuizQuestionView, QuizQuestions},
        UserRole,
    },
};

/// Learning modules, their quiz questions, and emergency procedures.
pub struct ContentService {
    db: DbClient,
}

impl ContentService {
    pub fn new(db: DbClient) -> Self {
        Self { db }
    }

    pub async fn list_modules(
        &self,
        ctx: &AuthContext,
        query: ListModulesQuery,
    ) -> ServiceResult<Vec<LearningModuleRow>> {
        let is_staff = ctx.role().is_some_and(|r| r.is_staff());
        let mut filter = Filter::new();
        if !(query.include_inactive && is_staff) {
            filter = filter.eq("is_active", true);
        }
        if let Some(module_type) = query.module_type {
            filter = filter.eq("module_type", module_type);
        }
        if let Some(difficulty) = query.difficulty_level {
            filter = filter.eq("difficulty_level", difficulty);
        }

        Ok(self
            .db
            .from::<LearningModules>()
            .select(&ctx.caller(), &filter.order("order_index", true))
            .await?)
    }

    /// Inactive modules are visible to staff only.
    pub async fn find_module(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<LearningModuleRow> {
        let module = self
            .db
            .from::<LearningModules>()
            .select_one(&ctx.caller(), Filter::new().eq("id", id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Module {} not found", id)))?;

        let is_staff = ctx.role().is_some_and(|r| r.is_staff());
        if !module.is_active && !is_staff {
            return Err(ServiceError::NotFound(format!("Module {} not found", id)));
        }
        Ok(module)
    }

    pub async fn questions(
        &self,
        ctx: &AuthContext,
        module_id: Uuid,
    ) -> ServiceResult<Vec<QuizQuestionRow>> {
        Ok(self
            .db
            .from::<QuizQuestions>()
            .select(
                &ctx.caller(),
                &Filter::new()
                    .eq("module_id", module_id)
                    .order("order_index", true),
            )
            .await?)
    }

    pub async fn module_detail(&self, ctx: &AuthContext, id: Uuid) -> ServiceResult<ModuleDetail> {
        let module = self.find_module(ctx, id).await?;
        let reveal_answers = ctx.role().is_some_and(|r| r.is_staff());
        let questions = self
            .questions(ctx, id)
            .await?
            .into_iter()
            .map(|q| QuizQuestionView::new(q, reveal_answers))
            .collect();

        Ok(ModuleDetail { module, questions })
    }

    pub async fn create_module(
        &self,
        ctx: &AuthContext,
        req: CreateModuleRequest,
    ) -> ServiceResult<LearningModuleRow> {
        let module = self
            .db
            .from::<LearningModules>()
            .insert(&ctx.caller(), &req.into_insert(ctx.user.id))
            .await?;
        tracing::info!(module_id = %module.id, author = %ctx.user.id, "Module created");
        Ok(module)
    }

    /// Admins edit any module; teachers only the ones they created.
    pub async fn update_module(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        req: UpdateModuleRequest,
    ) -> ServiceResult<LearningModuleRow> {
        let module = self.find_module(ctx, id).await?;
        ensure_can_edit(ctx, &module)?;

        let patch = LearningModuleUpdate::from(req);
        self.db
            .from::<LearningModules>()
            .update(&ctx.caller(), &Filter::new().eq("id", id), &patch)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Module {} not found", id)))
    }

    pub async fn add_question(
        &self,
        ctx: &AuthContext,
        module_id: Uuid,
        req: CreateQuestionRequest,
    ) -> ServiceResult<QuizQuestionRow> {
        if !req.correct_answer_in_range() {
            return Err(ServiceError::Invalid(format!(
                "correct_answer {} does not index into {} options",
                req.correct_answer,
                req.options.len()
            )));
        }
        let module = self.find_module(ctx, module_id).await?;
        ensure_can_edit(ctx, &module)?;

        Ok(self
            .db
            .from::<QuizQuestions>()
            .insert(&ctx.caller(), &req.into_insert(module_id))
            .await?)
    }

    pub async fn list_procedures(
        &self,
        ctx: &AuthContext,
        query: ListProceduresQuery,
    ) -> ServiceResult<Vec<EmergencyProcedureRow>> {
        let mut filter = Filter::new();
        if let Some(category) = query.category.filter(|c| !c.is_empty()) {
            filter = filter.eq("category", category);
        }
        Ok(self
            .db
            .from::<EmergencyProcedures>()
            .select(&ctx.caller(), &filter.order("title", true))
            .await?)
    }

    pub async fn get_procedure(
        &self,
        ctx: &AuthContext,
        id: Uuid,
    ) -> ServiceResult<EmergencyProcedureRow> {
        self.db
            .from::<EmergencyProcedures>()
            .select_one(&ctx.caller(), Filter::new().eq("id", id))
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Emergency procedure {} not found", id)))
    }

    pub async fn create_procedure(
        &self,
        ctx: &AuthContext,
        req: CreateProcedureRequest,
    ) -> ServiceResult<EmergencyProcedureRow> {
        Ok(self
            .db
            .from::<EmergencyProcedures>()
            .insert(&ctx.caller(), &req.into())
            .await?)
    }

    pub async fn update_procedure(
        &self,
        ctx: &AuthContext,
        id: Uuid,
        req: UpdateProcedureRequest,
    ) -> ServiceResult<EmergencyProcedureRow> {
        let mut patch = EmergencyProcedureUpdate::from(req);
        patch.updated_at.get_or_insert_with(Utc::now);
        self.db
            .from::<EmergencyProcedures>()
            .update(&ctx.caller(), &Filter::new().eq("id", id), &patch)
            .await?
            .pop()
            .ok_or_else(|| ServiceError::NotFound(format!("Emergency procedure {} not found", id)))
    }
}

fn ensure_can_edit(ctx: &AuthContext, module: &LearningModuleRow) -> ServiceResult<()> {
    match ctx.role() {
        Some(UserRole::Admin) => Ok(()),
        Some(UserRole::Teacher) if module.created_by == Some(ctx.user.id) => Ok(()),
        Some(UserRole::Teacher) => Err(ServiceError::Forbidden(
            "Teachers can only edit modules they created".to_string(),
        )),
        _ => Err(ServiceError::Forbidden(
            "Teacher or admin role required".to_string(),
        )),
    }
}
