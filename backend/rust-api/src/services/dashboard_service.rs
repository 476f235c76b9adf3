//! Role-branching dashboard.
//!
//! [`render_dashboard`] is a pure function of the caller's profile and a set of
//! metrics. [`DashboardService`] decides where the metrics come from: fixed
//! placeholder figures by default, live counts when `dashboard.live_metrics`
//! is enabled.

use super::ServiceResult;
use crate::{
    db::{DbClient, Filter},
    metrics,
    middlewares::auth::AuthContext,
    models::{
        achievement::{earned_points, Achievements, UserAchievements},
        dashboard::{
            format_count, percent_of, AchievementsCard, ActionButton, ActionPanel, AdminMetrics,
            DashboardContent, DashboardHeader, DashboardKind, DashboardMetrics, DashboardView,
            Icon, ProgressCard, RoleBadge, RoleColor, StatCard, StudentMetrics, SummaryCard,
            TeacherMetrics,
        },
        learning_module::LearningModules,
        profile::{ProfileRow, Profiles},
        user_progress::UserProgress,
        DbEnum, UserRole,
    },
};

pub const APP_TITLE: &str = "DisasterPrep Learn";

fn tagline(role: UserRole) -> &'static str {
    match role {
        UserRole::Admin => "Manage the DisasterPrep Learn platform and monitor all activities.",
        UserRole::Teacher => "Create engaging content and track your students' progress.",
        UserRole::Student => {
            "Continue your disaster preparedness journey and build life-saving skills."
        }
    }
}

fn role_badge(profile: Option<&ProfileRow>) -> RoleBadge {
    let role = profile.map(|p| p.role);
    let (icon, color) = match DashboardKind::for_role(role) {
        DashboardKind::Admin => (Icon::Shield, RoleColor::Red),
        DashboardKind::Teacher => (Icon::Users, RoleColor::Blue),
        DashboardKind::Student => (Icon::GraduationCap, RoleColor::Green),
    };
    RoleBadge {
        icon,
        color,
        label: role.map(|r| r.as_str()),
    }
}

fn admin_content(m: &AdminMetrics) -> DashboardContent {
    let trends = m.trends;
    DashboardContent::Admin {
        stats: vec![
            StatCard {
                title: "Total Users",
                value: format_count(m.total_users),
                caption: trends.map(|t| t.users),
                icon: Icon::Users,
            },
            StatCard {
                title: "Active Modules",
                value: format_count(m.active_modules),
                caption: trends.map(|t| t.modules),
                icon: Icon::BookOpen,
            },
            StatCard {
                title: "Completion Rate",
                value: format!("{}%", m.completion_rate),
                caption: trends.map(|t| t.completion),
                icon: Icon::BarChart,
            },
        ],
        controls: ActionPanel {
            title: "Admin Controls",
            description: Some("Manage the DisasterPrep Learn platform"),
            actions: vec![
                ActionButton::primary("Manage Users", Some(Icon::Users)),
                ActionButton::outline("Manage Modules", Some(Icon::BookOpen)),
                ActionButton::outline("Manage Achievements", Some(Icon::Trophy)),
                ActionButton::outline("System Settings", Some(Icon::Settings)),
            ],
        },
    }
}

fn teacher_content(m: &TeacherMetrics) -> DashboardContent {
    DashboardContent::Teacher {
        summaries: vec![
            SummaryCard {
                title: "My Students",
                description: "Monitor student progress and performance",
                headline: format!("{} Active Students", format_count(m.active_students)),
                action: ActionButton::primary("View All Students", None),
            },
            SummaryCard {
                title: "Course Management",
                description: "Create and manage learning content",
                headline: format!("{} Modules", format_count(m.modules)),
                action: ActionButton::outline("Manage Modules", None),
            },
        ],
        quick_actions: ActionPanel {
            title: "Quick Actions",
            description: None,
            actions: vec![
                ActionButton::primary("Create Module", Some(Icon::BookOpen)),
                ActionButton::outline("View Reports", Some(Icon::BarChart)),
                ActionButton::outline("Student Progress", Some(Icon::Users)),
            ],
        },
    }
}

fn student_content(m: &StudentMetrics) -> DashboardContent {
    DashboardContent::Student {
        progress: ProgressCard {
            title: "Your Progress",
            description: "Continue your disaster preparedness journey",
            modules_completed: m.modules_completed,
            modules_total: m.modules_total,
            completed_label: format!("{}/{}", m.modules_completed, m.modules_total),
            percent: m.percent(),
            action: ActionButton::primary("Continue Learning", None),
        },
        achievements: AchievementsCard {
            title: "Achievements",
            description: "Your earned badges and points",
            total_points: m.total_points,
            badges_earned: m.badges_earned,
            action: ActionButton::outline("View All Achievements", None),
        },
        modules: ActionPanel {
            title: "Learning Modules",
            description: Some("Choose what you want to learn today"),
            actions: vec![
                ActionButton::primary("Earthquake Safety", Some(Icon::Shield)),
                ActionButton::outline("CPR Training", Some(Icon::Heart)),
                ActionButton::outline("Emergency Kit", Some(Icon::Zap)),
                ActionButton::outline("Fire Safety", Some(Icon::Shield)),
                ActionButton::outline("First Aid Basics", Some(Icon::Heart)),
                ActionButton::outline("Flood Response", Some(Icon::Zap)),
            ],
        },
    }
}

/// Builds the view for `profile`. The content block follows `metrics`, which
/// callers obtain for `DashboardKind::for_role` of the same profile.
pub fn render_dashboard(profile: Option<&ProfileRow>, metrics: &DashboardMetrics) -> DashboardView {
    let header = DashboardHeader {
        title: APP_TITLE,
        role_badge: role_badge(profile),
        full_name: profile.map(|p| p.full_name.clone()),
        sign_out: ActionButton::outline("Sign Out", Some(Icon::LogOut)),
    };

    let content = match metrics {
        DashboardMetrics::Admin(m) => admin_content(m),
        DashboardMetrics::Teacher(m) => teacher_content(m),
        DashboardMetrics::Student(m) => student_content(m),
    };

    DashboardView {
        header,
        greeting: format!(
            "Welcome back, {}!",
            profile.map(ProfileRow::first_name).unwrap_or_default()
        ),
        tagline: profile.map(|p| tagline(p.role)),
        content,
    }
}

pub struct DashboardService {
    db: DbClient,
    live_metrics: bool,
}

impl DashboardService {
    pub fn new(db: DbClient, live_metrics: bool) -> Self {
        Self { db, live_metrics }
    }

    pub async fn render(&self, ctx: &AuthContext) -> ServiceResult<DashboardView> {
        let kind = DashboardKind::for_role(ctx.role());
        let metrics = if self.live_metrics {
            self.live(kind, ctx).await?
        } else {
            DashboardMetrics::placeholder(kind)
        };

        metrics::record_dashboard_view(kind.as_str());
        tracing::debug!(user_id = %ctx.user.id, dashboard = kind.as_str(), live = self.live_metrics, "Rendering dashboard");

        Ok(render_dashboard(ctx.profile.as_ref(), &metrics))
    }

    async fn live(&self, kind: DashboardKind, ctx: &AuthContext) -> ServiceResult<DashboardMetrics> {
        let caller = ctx.caller();
        let active = Filter::new().eq("is_active", true);

        let metrics = match kind {
            DashboardKind::Admin => {
                let all = Filter::new();
                let done = Filter::new().eq("is_completed", true);
                let (profiles, modules, progress) = (
                    self.db.from::<Profiles>(),
                    self.db.from::<LearningModules>(),
                    self.db.from::<UserProgress>(),
                );
                let (total_users, active_modules, started, completed) = futures::try_join!(
                    profiles.count(&caller, &all),
                    modules.count(&caller, &active),
                    progress.count(&caller, &all),
                    progress.count(&caller, &done),
                )?;
                DashboardMetrics::Admin(AdminMetrics {
                    total_users,
                    active_modules,
                    completion_rate: percent_of(completed, started),
                    trends: None,
                })
            }
            DashboardKind::Teacher => {
                let active_students = self
                    .db
                    .from::<Profiles>()
                    .count(&caller, &Filter::new().eq("role", UserRole::Student))
                    .await?;
                let modules = self
                    .db
                    .from::<LearningModules>()
                    .count(&caller, &Filter::new().eq("created_by", ctx.user.id))
                    .await?;
                DashboardMetrics::Teacher(TeacherMetrics {
                    active_students,
                    modules,
                })
            }
            DashboardKind::Student => {
                let own = Filter::new().eq("user_id", ctx.user.id);
                let own_completed = own.clone().eq("is_completed", true);
                let everything = Filter::new();
                let (progress, modules, user_achievements, achievements) = (
                    self.db.from::<UserProgress>(),
                    self.db.from::<LearningModules>(),
                    self.db.from::<UserAchievements>(),
                    self.db.from::<Achievements>(),
                );
                let (modules_completed, modules_total, earned, catalog) = futures::try_join!(
                    progress.count(&caller, &own_completed),
                    modules.count(&caller, &active),
                    user_achievements.select(&caller, &own),
                    achievements.select(&caller, &everything),
                )?;
                DashboardMetrics::Student(StudentMetrics {
                    modules_completed,
                    modules_total,
                    total_points: earned_points(&catalog, &earned),
                    badges_earned: earned.len() as u64,
                })
            }
        };
        Ok(metrics)
    }
}
