use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;

/// Privilege level stored on the `users` row. Anything we cannot parse
/// resolves to `Normal`, so a missing or mangled role never grants access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Normal,
    Client,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn parse(s: &str) -> Role {
        match s {
            "client" => Role::Client,
            "admin" => Role::Admin,
            "superadmin" => Role::SuperAdmin,
            _ => Role::Normal,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Normal => "normal",
            Role::Client => "client",
            Role::Admin => "admin",
            Role::SuperAdmin => "superadmin",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }
}

/// Lifecycle state of an appointment. Stored lowercase in the `status`
/// column; older records may carry mixed-case values, so parsing folds case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentStatus {
    PendingApproval,
    Approved,
    Rescheduled,
    PendingReschedule,
    Revoked,
}

impl AppointmentStatus {
    pub fn parse(s: &str) -> Option<AppointmentStatus> {
        match s.to_lowercase().as_str() {
            "pending approval" => Some(AppointmentStatus::PendingApproval),
            "approved" => Some(AppointmentStatus::Approved),
            "rescheduled" => Some(AppointmentStatus::Rescheduled),
            "pending reschedule" => Some(AppointmentStatus::PendingReschedule),
            "revoked" => Some(AppointmentStatus::Revoked),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::PendingApproval => "pending approval",
            AppointmentStatus::Approved => "approved",
            AppointmentStatus::Rescheduled => "rescheduled",
            AppointmentStatus::PendingReschedule => "pending reschedule",
            AppointmentStatus::Revoked => "revoked",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            AppointmentStatus::PendingApproval => "⏳ Pending approval",
            AppointmentStatus::Approved => "✅ Approved",
            AppointmentStatus::Rescheduled => "🔁 Rescheduled",
            AppointmentStatus::PendingReschedule => "📅 Pending reschedule",
            AppointmentStatus::Revoked => "❌ Revoked",
        }
    }

    /// Admin approval applies to anything not already approved or revoked.
    pub fn can_approve(&self) -> bool {
        !matches!(
            self,
            AppointmentStatus::Approved | AppointmentStatus::Revoked
        )
    }

    /// Both the client's own reschedule and an admin suggestion are shut
    /// off once the appointment is revoked.
    pub fn can_reschedule(&self) -> bool {
        !matches!(self, AppointmentStatus::Revoked)
    }

    /// Accept/decline is only meaningful while a suggestion is outstanding.
    pub fn awaiting_decision(&self) -> bool {
        matches!(self, AppointmentStatus::PendingReschedule)
    }
}

/// Testimonial category, fixed vocabulary from the submission form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestimonialCategory {
    Patient,
    Witness,
    General,
}

impl TestimonialCategory {
    pub fn parse(s: &str) -> Option<TestimonialCategory> {
        match s {
            "Patient" => Some(TestimonialCategory::Patient),
            "Witness" => Some(TestimonialCategory::Witness),
            "General" => Some(TestimonialCategory::General),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TestimonialCategory::Patient => "Patient",
            TestimonialCategory::Witness => "Witness",
            TestimonialCategory::General => "General",
        }
    }

    pub const ALL: [TestimonialCategory; 3] = [
        TestimonialCategory::Patient,
        TestimonialCategory::Witness,
        TestimonialCategory::General,
    ];
}

#[derive(Debug, FromRow)]
pub struct User {
    pub id: i32,
    pub telegram_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub role: String,
}

#[derive(Debug, FromRow)]
pub struct PendingClient {
    pub id: i32,
    pub telegram_id: i64,
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub age: i32,
    pub location: String,
}

#[derive(Debug, FromRow)]
pub struct Appointment {
    pub id: i32,
    pub user_id: i32,
    pub patient_name: String,
    pub whatsapp: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub service: String,
    pub doctor_name: String,
    pub status: String,
    pub suggested_date: Option<NaiveDate>,
    pub suggested_time: Option<NaiveTime>,
    pub previous_date: Option<NaiveDate>,
    pub previous_time: Option<NaiveTime>,
    pub admin_comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct Testimonial {
    pub id: i32,
    pub user_id: i32,
    pub name: String,
    pub category: String,
    pub message: String,
    pub status: String,
}

#[derive(Debug, FromRow)]
pub struct Blog {
    pub id: i32,
    pub title: String,
    pub content: String,
    pub image_url: Option<String>,
    pub likes: i32,
    pub shares: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct BlogComment {
    pub id: i32,
    pub blog_id: i32,
    pub name: String,
    pub comment: String,
    pub status: String,
}

#[derive(Debug, FromRow)]
pub struct Contact {
    pub id: i32,
    pub name: String,
    pub email: Option<String>,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
pub struct TeamMember {
    pub id: i32,
    pub name: String,
    pub role: String,
    pub bio: String,
    pub photo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_defaults_to_normal() {
        assert_eq!(Role::parse("admin"), Role::Admin);
        assert_eq!(Role::parse("superadmin"), Role::SuperAdmin);
        assert_eq!(Role::parse("client"), Role::Client);
        assert_eq!(Role::parse("normal"), Role::Normal);
        assert_eq!(Role::parse(""), Role::Normal);
        assert_eq!(Role::parse("owner"), Role::Normal);
    }

    #[test]
    fn admin_gate_is_fail_closed() {
        assert!(Role::Admin.is_admin());
        assert!(Role::SuperAdmin.is_admin());
        assert!(!Role::Client.is_admin());
        assert!(!Role::Normal.is_admin());
        assert!(!Role::parse("garbage").is_admin());
    }

    #[test]
    fn status_round_trips_and_folds_case() {
        for s in [
            AppointmentStatus::PendingApproval,
            AppointmentStatus::Approved,
            AppointmentStatus::Rescheduled,
            AppointmentStatus::PendingReschedule,
            AppointmentStatus::Revoked,
        ] {
            assert_eq!(AppointmentStatus::parse(s.as_str()), Some(s));
        }
        // Mixed-case values written by an earlier revision of the admin UI.
        assert_eq!(
            AppointmentStatus::parse("Approved"),
            Some(AppointmentStatus::Approved)
        );
        assert_eq!(
            AppointmentStatus::parse("Pending Reschedule"),
            Some(AppointmentStatus::PendingReschedule)
        );
        assert_eq!(AppointmentStatus::parse("done"), None);
    }

    #[test]
    fn approve_excluded_for_approved_and_revoked() {
        assert!(AppointmentStatus::PendingApproval.can_approve());
        assert!(AppointmentStatus::Rescheduled.can_approve());
        assert!(AppointmentStatus::PendingReschedule.can_approve());
        assert!(!AppointmentStatus::Approved.can_approve());
        assert!(!AppointmentStatus::Revoked.can_approve());
    }

    #[test]
    fn revoked_is_terminal_for_rescheduling() {
        assert!(AppointmentStatus::Approved.can_reschedule());
        assert!(AppointmentStatus::PendingApproval.can_reschedule());
        assert!(!AppointmentStatus::Revoked.can_reschedule());
    }

    #[test]
    fn only_pending_reschedule_awaits_decision() {
        assert!(AppointmentStatus::PendingReschedule.awaiting_decision());
        assert!(!AppointmentStatus::Approved.awaiting_decision());
        assert!(!AppointmentStatus::Rescheduled.awaiting_decision());
    }

    #[test]
    fn testimonial_category_vocabulary() {
        for c in TestimonialCategory::ALL {
            assert_eq!(TestimonialCategory::parse(c.as_str()), Some(c));
        }
        assert_eq!(TestimonialCategory::parse("patient"), None);
    }
}
