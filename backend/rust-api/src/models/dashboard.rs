use serde::Serialize;

use super::UserRole;

/// Icon names from the front end's icon set.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum Icon {
    Shield,
    Users,
    GraduationCap,
    BookOpen,
    Trophy,
    Heart,
    Zap,
    LogOut,
    Settings,
    BarChart,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RoleColor {
    Red,
    Blue,
    Green,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ButtonVariant {
    Primary,
    Outline,
}

/// Which of the three mutually exclusive dashboards a caller gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DashboardKind {
    Admin,
    Teacher,
    Student,
}

impl DashboardKind {
    /// Admin and teacher get their own dashboards; everything else,
    /// including a missing profile, falls back to the student one.
    pub fn for_role(role: Option<UserRole>) -> Self {
        match role {
            Some(UserRole::Admin) => DashboardKind::Admin,
            Some(UserRole::Teacher) => DashboardKind::Teacher,
            _ => DashboardKind::Student,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DashboardKind::Admin => "admin",
            DashboardKind::Teacher => "teacher",
            DashboardKind::Student => "student",
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionButton {
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    pub variant: ButtonVariant,
}

impl ActionButton {
    pub fn primary(label: &'static str, icon: Option<Icon>) -> Self {
        ActionButton {
            label,
            icon,
            variant: ButtonVariant::Primary,
        }
    }

    pub fn outline(label: &'static str, icon: Option<Icon>) -> Self {
        ActionButton {
            label,
            icon,
            variant: ButtonVariant::Outline,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoleBadge {
    pub icon: Icon,
    pub color: RoleColor,
    /// Raw role string; absent when the caller has no profile.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardHeader {
    pub title: &'static str,
    pub role_badge: RoleBadge,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    pub sign_out: ActionButton,
}

/// Headline metric card on the admin dashboard.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatCard {
    pub title: &'static str,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub caption: Option<&'static str>,
    pub icon: Icon,
}

/// Card with a headline and a single call to action.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SummaryCard {
    pub title: &'static str,
    pub description: &'static str,
    pub headline: String,
    pub action: ActionButton,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ActionPanel {
    pub title: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
    pub actions: Vec<ActionButton>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ProgressCard {
    pub title: &'static str,
    pub description: &'static str,
    pub modules_completed: u64,
    pub modules_total: u64,
    /// Display form, e.g. "3/12".
    pub completed_label: String,
    pub percent: u8,
    pub action: ActionButton,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AchievementsCard {
    pub title: &'static str,
    pub description: &'static str,
    pub total_points: i64,
    pub badges_earned: u64,
    pub action: ActionButton,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardContent {
    Admin {
        stats: Vec<StatCard>,
        controls: ActionPanel,
    },
    Teacher {
        summaries: Vec<SummaryCard>,
        quick_actions: ActionPanel,
    },
    Student {
        progress: ProgressCard,
        achievements: AchievementsCard,
        modules: ActionPanel,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardView {
    pub header: DashboardHeader,
    pub greeting: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tagline: Option<&'static str>,
    pub content: DashboardContent,
}

/// Trend captions shown under the admin stat cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdminTrends {
    pub users: &'static str,
    pub modules: &'static str,
    pub completion: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AdminMetrics {
    pub total_users: u64,
    pub active_modules: u64,
    pub completion_rate: u8,
    pub trends: Option<AdminTrends>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TeacherMetrics {
    pub active_students: u64,
    pub modules: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentMetrics {
    pub modules_completed: u64,
    pub modules_total: u64,
    pub total_points: i64,
    pub badges_earned: u64,
}

impl StudentMetrics {
    pub fn percent(&self) -> u8 {
        percent_of(self.modules_completed, self.modules_total)
    }
}

/// Numbers behind a dashboard, either placeholders or live counts.
#[derive(Debug, Clone, PartialEq)]
pub enum DashboardMetrics {
    Admin(AdminMetrics),
    Teacher(TeacherMetrics),
    Student(StudentMetrics),
}

impl DashboardMetrics {
    /// Fixed figures the dashboard shows when live metrics are disabled.
    pub fn placeholder(kind: DashboardKind) -> Self {
        match kind {
            DashboardKind::Admin => DashboardMetrics::Admin(AdminMetrics {
                total_users: 1234,
                active_modules: 45,
                completion_rate: 78,
                trends: Some(AdminTrends {
                    users: "+10% from last month",
                    modules: "+5 new this week",
                    completion: "+2% from last week",
                }),
            }),
            DashboardKind::Teacher => DashboardMetrics::Teacher(TeacherMetrics {
                active_students: 32,
                modules: 12,
            }),
            DashboardKind::Student => DashboardMetrics::Student(StudentMetrics {
                modules_completed: 3,
                modules_total: 12,
                total_points: 150,
                badges_earned: 2,
            }),
        }
    }
}

/// Integer percentage, 0 when the denominator is 0, capped at 100.
pub fn percent_of(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    let percent = (part as f64 / whole as f64 * 100.0).round();
    percent.clamp(0.0, 100.0) as u8
}

/// Formats a count with comma thousands separators: 1234 -> "1,234".
pub fn format_count(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(45), "45");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234), "1,234");
        assert_eq!(format_count(1234567), "1,234,567");
    }

    #[test]
    fn test_percent_of() {
        assert_eq!(percent_of(3, 12), 25);
        assert_eq!(percent_of(0, 0), 0);
        assert_eq!(percent_of(2, 3), 67);
        assert_eq!(percent_of(5, 4), 100);
    }

    #[test]
    fn test_kind_for_role() {
        assert_eq!(DashboardKind::for_role(Some(UserRole::Admin)), DashboardKind::Admin);
        assert_eq!(
            DashboardKind::for_role(Some(UserRole::Teacher)),
            DashboardKind::Teacher
        );
        assert_eq!(
            DashboardKind::for_role(Some(UserRole::Student)),
            DashboardKind::Student
        );
        assert_eq!(DashboardKind::for_role(None), DashboardKind::Student);
    }

    #[test]
    fn test_icon_names() {
        assert_eq!(
            serde_json::to_value(Icon::GraduationCap).unwrap(),
            "graduation-cap"
        );
        assert_eq!(serde_json::to_value(Icon::BarChart).unwrap(), "bar-chart");
        assert_eq!(serde_json::to_value(Icon::LogOut).unwrap(), "log-out");
    }
}
