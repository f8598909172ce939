use chrono::{Local, NaiveDate, NaiveTime};
use log::{error, info};
use sqlx::PgPool;
use std::{collections::HashMap, error::Error};
use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, Message,
        ReplyMarkup,
    },
};

use crate::admin;
use crate::models::{
    Appointment, AppointmentStatus, Blog, BlogComment, Role, TeamMember, Testimonial,
    TestimonialCategory, User,
};
use crate::phone;

pub type HandlerResult = Result<(), Box<dyn Error + Send + Sync>>;

pub const CLINIC_NAME: &str = "PhysioCare";
pub const DOCTOR_NAME: &str = "Dr. Jasmine Gatiba";

pub const SERVICES: &[&str] = &[
    "Preventive Physiotherapy",
    "Therapeutic Care",
    "Rehabilitation Programs",
    "Pain Management",
    "Sports Physiotherapy",
];

// Client-facing menu labels.
pub const BTN_REGISTER: &str = "📝 Register";
pub const BTN_BOOK: &str = "📅 Book appointment";
pub const BTN_MY_APPTS: &str = "🗂 My appointments";
pub const BTN_TESTIMONIALS: &str = "💬 Testimonials";
pub const BTN_BLOG: &str = "📰 Blog";
pub const BTN_TEAM: &str = "👥 Our team";
pub const BTN_CONTACT: &str = "✉️ Contact us";
pub const BTN_CANCEL: &str = "⟵ Cancel";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserStep {
    #[default]
    Idle,
    // Registration (staged client record)
    RegisterName,
    RegisterEmail,
    RegisterPhone,
    RegisterAge,
    RegisterLocation,
    // Booking
    BookPatientName,
    BookWhatsApp,
    BookDate,
    BookTime,
    BookService,
    // Client reschedule of an existing appointment
    ReschedDate,
    ReschedTime,
    // Testimonials
    TestimonialName,
    TestimonialMessage,
    // Blog comments
    CommentName,
    CommentText,
    // Contact form
    ContactName,
    ContactEmail,
    ContactMessage,
    // Admin console flows (handled in admin.rs, gated on role)
    AdminSuggestDate,
    AdminSuggestTime,
    AdminComment,
    AdminDashSearch,
    AdminTeamName,
    AdminTeamRole,
    AdminTeamBio,
    AdminTeamPhoto,
    AdminBlogTitle,
    AdminBlogContent,
    AdminBlogImage,
}

#[derive(Default)]
pub struct RegistrationDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: String,
    pub age: i32,
    pub location: String,
}

#[derive(Default)]
pub struct BookingDraft {
    pub patient_name: String,
    pub whatsapp: String,
    pub date: Option<NaiveDate>,
    pub time: Option<NaiveTime>,
}

#[derive(Default)]
pub struct TestimonialDraft {
    pub editing: Option<i32>,
    pub name: String,
    pub category: Option<TestimonialCategory>,
}

#[derive(Default)]
pub struct ContactDraft {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Default)]
pub struct TeamDraft {
    pub editing: Option<i32>,
    pub name: String,
    pub role: String,
    pub bio: String,
}

#[derive(Default)]
pub struct BlogDraft {
    pub editing: Option<i32>,
    pub title: String,
    pub content: String,
}

/// Per-chat conversational state. Initialized unauthenticated on first
/// contact, refreshed on /start and torn down on /logout.
#[derive(Default)]
pub struct UserSession {
    pub step: UserStep,
    pub user_id: Option<i32>,
    pub role: Role,
    pub display_name: String,
    pub email: Option<String>,
    pub registration: RegistrationDraft,
    pub booking: BookingDraft,
    pub testimonial: TestimonialDraft,
    pub contact: ContactDraft,
    pub team: TeamDraft,
    pub blog: BlogDraft,
    pub comment_name: String,
    pub active_appointment: Option<i32>,
    pub active_blog: Option<i32>,
    pub resched_date: Option<NaiveDate>,
    pub suggest_date: Option<NaiveDate>,
    pub dash_filter: Option<String>,
}

impl UserSession {
    pub fn new() -> Self {
        Self::default()
    }
}

pub async fn handle_message(
    msg: Message,
    bot: Bot,
    pool: PgPool,
    user_sessions: &mut HashMap<i64, UserSession>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let text = msg.text().unwrap_or("").trim();
    let session = user_sessions.entry(chat_id.0).or_insert_with(UserSession::new);

    if let Some(payload) = text.strip_prefix("/start") {
        start(&bot, chat_id, &pool, session).await?;
        // Deep link from a shared blog post: /start blog_<id>
        if let Some(blog_id) = payload
            .trim()
            .strip_prefix("blog_")
            .and_then(|s| s.parse::<i32>().ok())
        {
            show_blog(&bot, chat_id, &pool, blog_id).await?;
        }
        return Ok(());
    }

    match text {
        "/logout" => {
            *session = UserSession::new();
            bot.send_message(chat_id, "You are signed out. Send /start whenever you need us again.")
                .await?;
            return Ok(());
        }
        BTN_CANCEL => {
            session.step = UserStep::Idle;
            if session.role.is_admin() {
                return admin::show_admin_menu(&bot, chat_id).await;
            }
            return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
        }
        BTN_REGISTER => {
            return begin_registration(&bot, chat_id, &pool, session).await;
        }
        BTN_BOOK => {
            if session.user_id.is_none() {
                bot.send_message(
                    chat_id,
                    "Booking needs an account. Tap 📝 Register and the clinic will set you up.",
                )
                .await?;
                return send_main_menu(&bot, chat_id, false).await;
            }
            session.booking = BookingDraft::default();
            session.step = UserStep::BookPatientName;
            bot.send_message(chat_id, "Who is the appointment for? Please enter the patient's name:")
                .reply_markup(cancel_keyboard())
                .await?;
            return Ok(());
        }
        BTN_MY_APPTS => {
            let Some(user_id) = session.user_id else {
                bot.send_message(chat_id, "Please register first — your appointments will appear here.")
                    .await?;
                return send_main_menu(&bot, chat_id, false).await;
            };
            return show_my_appointments(&bot, chat_id, &pool, user_id).await;
        }
        BTN_TESTIMONIALS => {
            return show_testimonials(&bot, chat_id, &pool, session.user_id).await;
        }
        BTN_BLOG => {
            return show_blog_index(&bot, chat_id, &pool).await;
        }
        BTN_TEAM => {
            return show_team(&bot, chat_id, &pool).await;
        }
        BTN_CONTACT => {
            session.contact = ContactDraft::default();
            if session.user_id.is_some() {
                session.contact.name = session.display_name.clone();
                session.contact.email = session.email.clone();
                session.step = UserStep::ContactMessage;
                bot.send_message(chat_id, "What would you like to tell the clinic?")
                    .reply_markup(cancel_keyboard())
                    .await?;
            } else {
                session.step = UserStep::ContactName;
                bot.send_message(chat_id, "Your name, please:")
                    .reply_markup(cancel_keyboard())
                    .await?;
            }
            return Ok(());
        }
        _ => {}
    }

    // Admin surface: labels and in-flight admin steps are only honored for
    // admin roles; anyone else silently lands back on the client menu.
    if admin::is_admin_label(text) {
        if session.role.is_admin() {
            return admin::handle_admin_label(&bot, chat_id, &pool, session, text).await;
        }
        info!("denied admin menu access for chat {}", chat_id.0);
        session.step = UserStep::Idle;
        return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
    }
    if admin::is_admin_step(session.step) {
        if session.role.is_admin() {
            return admin::handle_admin_step(&bot, chat_id, &pool, session, text).await;
        }
        session.step = UserStep::Idle;
        return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
    }

    match session.step {
        UserStep::Idle => {
            if !text.is_empty() {
                bot.send_message(chat_id, "Use the menu below, or send /start to begin.")
                    .await?;
                if session.role.is_admin() {
                    admin::show_admin_menu(&bot, chat_id).await?;
                } else {
                    send_main_menu(&bot, chat_id, session.user_id.is_some()).await?;
                }
            }
        }

        // ---------------- Registration ----------------
        UserStep::RegisterName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "The name must have at least 2 characters. Try again:")
                    .await?;
                return Ok(());
            }
            session.registration.name = text.to_string();
            session.step = UserStep::RegisterEmail;
            bot.send_message(chat_id, "Your email address (or send `skip`):")
                .await?;
        }
        UserStep::RegisterEmail => {
            if text.eq_ignore_ascii_case("skip") {
                session.registration.email = None;
            } else if text.contains('@') && text.contains('.') {
                session.registration.email = Some(text.to_string());
            } else {
                bot.send_message(chat_id, "That does not look like an email. Try again or send `skip`:")
                    .await?;
                return Ok(());
            }
            session.step = UserStep::RegisterPhone;
            bot.send_message(chat_id, "Your phone number (e.g. 0712345678 or 254712345678):")
                .await?;
        }
        UserStep::RegisterPhone => {
            let normalized = phone::normalize(text);
            if !phone::is_valid_phone(&normalized) {
                bot.send_message(
                    chat_id,
                    "The phone number must be a Kenyan number like 2547XXXXXXXX. Try again:",
                )
                .await?;
                return Ok(());
            }
            session.registration.phone = normalized;
            session.step = UserStep::RegisterAge;
            bot.send_message(chat_id, "Your age:").await?;
        }
        UserStep::RegisterAge => {
            match text.parse::<i32>() {
                Ok(age) if (1..=119).contains(&age) => {
                    session.registration.age = age;
                    session.step = UserStep::RegisterLocation;
                    bot.send_message(chat_id, "Where are you located?").await?;
                }
                _ => {
                    bot.send_message(chat_id, "Please send your age as a number:")
                        .await?;
                }
            }
        }
        UserStep::RegisterLocation => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Please tell us your town or area:")
                    .await?;
                return Ok(());
            }
            session.registration.location = text.to_string();
            let reg = &session.registration;
            let res = sqlx::query(
                "INSERT INTO pending_clients (telegram_id, name, email, phone, age, location) \
                 VALUES ($1, $2, $3, $4, $5, $6)",
            )
            .bind(chat_id.0)
            .bind(&reg.name)
            .bind(&reg.email)
            .bind(&reg.phone)
            .bind(reg.age)
            .bind(&reg.location)
            .execute(&pool)
            .await;
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    notify_admins(
                        &bot,
                        &pool,
                        &format!(
                            "🧑‍⚕️ New client registration awaiting an account: {} ({}, {})",
                            reg.name, reg.phone, reg.location
                        ),
                    )
                    .await;
                    bot.send_message(
                        chat_id,
                        format!(
                            "Thank you, {}! The clinic will set up your account shortly — \
                             we'll message you here the moment it is ready.",
                            reg.name
                        ),
                    )
                    .await?;
                    send_main_menu(&bot, chat_id, false).await?;
                }
                Err(e) => {
                    error!("failed to stage registration for {}: {e}", chat_id.0);
                    bot.send_message(
                        chat_id,
                        "⚠️ We could not save your registration. Please send your location again.",
                    )
                    .await?;
                }
            }
        }

        // ---------------- Booking ----------------
        UserStep::BookPatientName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "The patient name must have at least 2 characters. Try again:")
                    .await?;
                return Ok(());
            }
            session.booking.patient_name = text.to_string();
            session.step = UserStep::BookWhatsApp;
            bot.send_message(chat_id, "WhatsApp number for reminders, in the format 2547XXXXXXXX:")
                .await?;
        }
        UserStep::BookWhatsApp => {
            if !phone::is_valid_whatsapp(text) {
                bot.send_message(chat_id, "WhatsApp must be in format 2547XXXXXXXX. Try again:")
                    .await?;
                return Ok(());
            }
            session.booking.whatsapp = text.to_string();
            session.step = UserStep::BookDate;
            bot.send_message(chat_id, "Preferred date (YYYY-MM-DD):").await?;
        }
        UserStep::BookDate => {
            match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) if date >= Local::now().date_naive() => {
                    session.booking.date = Some(date);
                    session.step = UserStep::BookTime;
                    bot.send_message(chat_id, "Preferred time (HH:MM, 24h):").await?;
                }
                Ok(_) => {
                    bot.send_message(chat_id, "That date is in the past. Please pick another one:")
                        .await?;
                }
                Err(_) => {
                    bot.send_message(chat_id, "Please send the date as YYYY-MM-DD, e.g. 2025-03-01:")
                        .await?;
                }
            }
        }
        UserStep::BookTime => {
            match NaiveTime::parse_from_str(text, "%H:%M") {
                Ok(time) => {
                    session.booking.time = Some(time);
                    session.step = UserStep::BookService;
                    bot.send_message(chat_id, "Which service do you need?")
                        .reply_markup(services_keyboard())
                        .await?;
                }
                Err(_) => {
                    bot.send_message(chat_id, "Please send the time as HH:MM, e.g. 09:00:")
                        .await?;
                }
            }
        }
        UserStep::BookService => {
            if text.len() < 3 {
                bot.send_message(chat_id, "Please pick a service from the keyboard or type its name:")
                    .await?;
                return Ok(());
            }
            let (Some(user_id), Some(date), Some(time)) =
                (session.user_id, session.booking.date, session.booking.time)
            else {
                session.step = UserStep::Idle;
                return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
            };
            let booking = &session.booking;
            let res = sqlx::query_scalar::<_, i32>(
                "INSERT INTO appointments \
                 (user_id, patient_name, whatsapp, date, time, service, doctor_name, status) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, 'pending approval') \
                 RETURNING id",
            )
            .bind(user_id)
            .bind(&booking.patient_name)
            .bind(&booking.whatsapp)
            .bind(date)
            .bind(time)
            .bind(text)
            .bind(DOCTOR_NAME)
            .fetch_one(&pool)
            .await;
            match res {
                Ok(appt_id) => {
                    session.step = UserStep::Idle;
                    info!("appointment {appt_id} booked by user {user_id}");
                    notify_admins(
                        &bot,
                        &pool,
                        &format!(
                            "🆕 New appointment #{appt_id}: {} — {} on {} at {}. \
                             Review it under 📋 Appointments.",
                            booking.patient_name,
                            text,
                            fmt_date(date),
                            fmt_time(time)
                        ),
                    )
                    .await;
                    bot.send_message(
                        chat_id,
                        format!(
                            "Your appointment with {} for {} on {} at {} is booked and \
                             awaiting approval. We'll notify you here.",
                            DOCTOR_NAME,
                            text,
                            fmt_date(date),
                            fmt_time(time)
                        ),
                    )
                    .await?;
                    send_main_menu(&bot, chat_id, true).await?;
                }
                Err(e) => {
                    error!("failed to book appointment for user {user_id}: {e}");
                    bot.send_message(
                        chat_id,
                        "⚠️ Failed to book the appointment. Please pick the service again.",
                    )
                    .await?;
                }
            }
        }

        // ---------------- Client reschedule ----------------
        UserStep::ReschedDate => {
            match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) if date >= Local::now().date_naive() => {
                    session.resched_date = Some(date);
                    session.step = UserStep::ReschedTime;
                    bot.send_message(chat_id, "New time (HH:MM):").await?;
                }
                Ok(_) => {
                    bot.send_message(chat_id, "That date is in the past. Please pick another one:")
                        .await?;
                }
                Err(_) => {
                    bot.send_message(chat_id, "Please send the date as YYYY-MM-DD:").await?;
                }
            }
        }
        UserStep::ReschedTime => {
            let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M") else {
                bot.send_message(chat_id, "Please send the time as HH:MM:").await?;
                return Ok(());
            };
            let (Some(appt_id), Some(date), Some(user_id)) =
                (session.active_appointment, session.resched_date, session.user_id)
            else {
                session.step = UserStep::Idle;
                return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
            };
            let res = sqlx::query(
                "UPDATE appointments \
                 SET previous_date = date, previous_time = time, \
                     date = $1, time = $2, status = 'rescheduled', updated_at = NOW() \
                 WHERE id = $3 AND user_id = $4 AND status <> 'revoked'",
            )
            .bind(date)
            .bind(time)
            .bind(appt_id)
            .bind(user_id)
            .execute(&pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => {
                    session.step = UserStep::Idle;
                    session.active_appointment = None;
                    session.resched_date = None;
                    notify_admins(
                        &bot,
                        &pool,
                        &format!(
                            "🔁 Appointment #{appt_id} was rescheduled by the client to {} at {}.",
                            fmt_date(date),
                            fmt_time(time)
                        ),
                    )
                    .await;
                    bot.send_message(
                        chat_id,
                        format!("Rescheduled to {} at {}.", fmt_date(date), fmt_time(time)),
                    )
                    .await?;
                    send_main_menu(&bot, chat_id, true).await?;
                }
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.active_appointment = None;
                    session.resched_date = None;
                    bot.send_message(chat_id, "This appointment can no longer be rescheduled.")
                        .await?;
                    send_main_menu(&bot, chat_id, true).await?;
                }
                Err(e) => {
                    error!("reschedule of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to reschedule. Please send the time again.")
                        .await?;
                }
            }
        }

        // ---------------- Testimonials ----------------
        UserStep::TestimonialName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Please enter the name to publish with the testimonial:")
                    .await?;
                return Ok(());
            }
            session.testimonial.name = text.to_string();
            let rows: Vec<Vec<InlineKeyboardButton>> = TestimonialCategory::ALL
                .iter()
                .map(|c| {
                    vec![InlineKeyboardButton::callback(
                        c.as_str().to_string(),
                        format!("tcat:{}", c.as_str()),
                    )]
                })
                .collect();
            bot.send_message(chat_id, "Are you writing as a patient, a witness, or in general?")
                .reply_markup(InlineKeyboardMarkup::new(rows))
                .await?;
        }
        UserStep::TestimonialMessage => {
            if text.len() < 10 {
                bot.send_message(chat_id, "A few more words, please — at least 10 characters:")
                    .await?;
                return Ok(());
            }
            let (Some(user_id), Some(category)) = (session.user_id, session.testimonial.category)
            else {
                session.step = UserStep::Idle;
                return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
            };
            let res = if let Some(test_id) = session.testimonial.editing {
                sqlx::query(
                    "UPDATE testimonials \
                     SET name = $1, category = $2, message = $3, status = 'pending', updated_at = NOW() \
                     WHERE id = $4 AND user_id = $5",
                )
                .bind(&session.testimonial.name)
                .bind(category.as_str())
                .bind(text)
                .bind(test_id)
                .bind(user_id)
                .execute(&pool)
                .await
                .map(|r| r.rows_affected())
            } else {
                sqlx::query(
                    "INSERT INTO testimonials (user_id, name, category, message, status) \
                     VALUES ($1, $2, $3, $4, 'pending')",
                )
                .bind(user_id)
                .bind(&session.testimonial.name)
                .bind(category.as_str())
                .bind(text)
                .execute(&pool)
                .await
                .map(|r| r.rows_affected())
            };
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.testimonial = TestimonialDraft::default();
                    bot.send_message(chat_id, "Thank you! Your testimonial is pending approval.")
                        .await?;
                    send_main_menu(&bot, chat_id, true).await?;
                }
                Err(e) => {
                    error!("testimonial save failed for user {user_id}: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to save the testimonial. Please send it again.")
                        .await?;
                }
            }
        }

        // ---------------- Blog comments ----------------
        UserStep::CommentName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Please enter the name to show next to your comment:")
                    .await?;
                return Ok(());
            }
            session.comment_name = text.to_string();
            session.step = UserStep::CommentText;
            bot.send_message(chat_id, "Your comment:").await?;
        }
        UserStep::CommentText => {
            if text.len() < 3 {
                bot.send_message(chat_id, "Your comment is a bit short — try again:")
                    .await?;
                return Ok(());
            }
            let Some(blog_id) = session.active_blog else {
                session.step = UserStep::Idle;
                return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
            };
            let res = sqlx::query(
                "INSERT INTO blog_comments (blog_id, user_id, name, comment, status) \
                 VALUES ($1, $2, $3, $4, 'pending')",
            )
            .bind(blog_id)
            .bind(session.user_id)
            .bind(&session.comment_name)
            .bind(text)
            .execute(&pool)
            .await;
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.active_blog = None;
                    bot.send_message(chat_id, "Comment submitted — it will appear once approved.")
                        .await?;
                    send_main_menu(&bot, chat_id, session.user_id.is_some()).await?;
                }
                Err(e) => {
                    error!("comment on blog {blog_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to submit the comment. Please send it again.")
                        .await?;
                }
            }
        }

        // ---------------- Contact form ----------------
        UserStep::ContactName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Your name, please:").await?;
                return Ok(());
            }
            session.contact.name = text.to_string();
            session.step = UserStep::ContactEmail;
            bot.send_message(chat_id, "Your email (or send `skip`):").await?;
        }
        UserStep::ContactEmail => {
            if text.eq_ignore_ascii_case("skip") {
                session.contact.email = None;
            } else if text.contains('@') && text.contains('.') {
                session.contact.email = Some(text.to_string());
            } else {
                bot.send_message(chat_id, "That does not look like an email. Try again or send `skip`:")
                    .await?;
                return Ok(());
            }
            session.step = UserStep::ContactMessage;
            bot.send_message(chat_id, "What would you like to tell the clinic?")
                .await?;
        }
        UserStep::ContactMessage => {
            if text.len() < 5 {
                bot.send_message(chat_id, "Please write a little more so we can help:")
                    .await?;
                return Ok(());
            }
            let res = sqlx::query(
                "INSERT INTO contacts (name, email, message) VALUES ($1, $2, $3)",
            )
            .bind(&session.contact.name)
            .bind(&session.contact.email)
            .bind(text)
            .execute(&pool)
            .await;
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    notify_admins(
                        &bot,
                        &pool,
                        &format!("📨 New contact message from {} — see 📨 Contact inbox.", session.contact.name),
                    )
                    .await;
                    bot.send_message(chat_id, "Thank you! The clinic will get back to you soon.")
                        .await?;
                    send_main_menu(&bot, chat_id, session.user_id.is_some()).await?;
                }
                Err(e) => {
                    error!("contact message save failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to send your message. Please try once more.")
                        .await?;
                }
            }
        }

        // Admin steps are dispatched above; reaching here means the sender
        // lost the role mid-flow.
        _ => {
            session.step = UserStep::Idle;
            send_main_menu(&bot, chat_id, session.user_id.is_some()).await?;
        }
    }
    Ok(())
}

pub async fn handle_callback_query(
    q: CallbackQuery,
    bot: Bot,
    msg: Message,
    pool: PgPool,
    user_sessions: &mut HashMap<i64, UserSession>,
) -> HandlerResult {
    let chat_id = msg.chat.id;
    let session = user_sessions.entry(chat_id.0).or_insert_with(UserSession::new);

    // Buttons can arrive in a chat whose session was never warmed up (for
    // example right after a restart), so re-resolve the identity first.
    if session.user_id.is_none() {
        if let Some(user) = resolve_identity(&pool, chat_id.0).await {
            apply_identity(session, &user);
        }
    }

    let Some(data) = q.data.clone() else {
        return Ok(());
    };

    if data.starts_with("a_") {
        if session.role.is_admin() {
            return admin::handle_admin_callback(&bot, chat_id, &msg, &pool, session, &data).await;
        }
        info!("denied admin callback from chat {}", chat_id.0);
        return send_main_menu(&bot, chat_id, session.user_id.is_some()).await;
    }

    match data.as_str() {
        "ignore" => {}
        "new_test" => {
            if session.user_id.is_none() {
                bot.send_message(chat_id, "Please register first to leave a testimonial.")
                    .await?;
                return Ok(());
            }
            session.testimonial = TestimonialDraft::default();
            session.step = UserStep::TestimonialName;
            bot.send_message(chat_id, "The name to publish with your testimonial:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        "dismiss" => {
            bot.edit_message_text(chat_id, msg.id, "Cancelled.").await?;
        }
        _ if data.starts_with("tcat:") => {
            let Some(cat) = data.split(':').nth(1).and_then(TestimonialCategory::parse) else {
                return Ok(());
            };
            session.testimonial.category = Some(cat);
            session.step = UserStep::TestimonialMessage;
            bot.send_message(chat_id, "Your experience, in your own words:")
                .await?;
        }
        _ if data.starts_with("edit_test:") => {
            let (Some(test_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            let found = sqlx::query_as::<_, Testimonial>(
                "SELECT * FROM testimonials WHERE id = $1 AND user_id = $2",
            )
            .bind(test_id)
            .bind(user_id)
            .fetch_optional(&pool)
            .await?;
            if found.is_none() {
                bot.send_message(chat_id, "That testimonial is gone.").await?;
                return Ok(());
            }
            session.testimonial = TestimonialDraft {
                editing: Some(test_id),
                ..Default::default()
            };
            session.step = UserStep::TestimonialName;
            bot.send_message(chat_id, "New name to publish with the testimonial:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("del_test:") => {
            let Some(test_id) = callback_id(&data) else { return Ok(()) };
            confirm(&bot, chat_id, "Delete this testimonial permanently?", &format!("del_test_yes:{test_id}"))
                .await?;
        }
        _ if data.starts_with("del_test_yes:") => {
            let (Some(test_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            match sqlx::query("DELETE FROM testimonials WHERE id = $1 AND user_id = $2")
                .bind(test_id)
                .bind(user_id)
                .execute(&pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Testimonial deleted.").await?;
                }
                Err(e) => {
                    error!("delete of testimonial {test_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to delete the testimonial. Try again.")
                        .await?;
                }
            }
        }

        // ---------------- Appointment actions ----------------
        _ if data.starts_with("resched:") => {
            let (Some(appt_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            let Some(appt) = own_appointment(&pool, appt_id, user_id).await? else {
                bot.send_message(chat_id, "That appointment no longer exists.").await?;
                return Ok(());
            };
            let status = AppointmentStatus::parse(&appt.status);
            if !status.map(|s| s.can_reschedule()).unwrap_or(false) {
                bot.send_message(chat_id, "A revoked appointment cannot be rescheduled — please book a new one.")
                    .await?;
                return Ok(());
            }
            session.active_appointment = Some(appt_id);
            session.resched_date = None;
            session.step = UserStep::ReschedDate;
            bot.send_message(
                chat_id,
                format!(
                    "Current schedule: {} at {}. New date (YYYY-MM-DD):",
                    fmt_date(appt.date),
                    fmt_time(appt.time)
                ),
            )
            .reply_markup(cancel_keyboard())
            .await?;
        }
        _ if data.starts_with("revoke:") => {
            let (Some(appt_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            let Some(appt) = own_appointment(&pool, appt_id, user_id).await? else {
                bot.send_message(chat_id, "That appointment no longer exists.").await?;
                return Ok(());
            };
            if AppointmentStatus::parse(&appt.status) == Some(AppointmentStatus::Revoked) {
                bot.send_message(chat_id, "This appointment is already revoked.").await?;
                return Ok(());
            }
            match sqlx::query(
                "UPDATE appointments SET status = 'revoked', updated_at = NOW() \
                 WHERE id = $1 AND user_id = $2",
            )
            .bind(appt_id)
            .bind(user_id)
            .execute(&pool)
            .await
            {
                Ok(_) => {
                    notify_admins(&bot, &pool, &format!("❌ Appointment #{appt_id} was revoked by the client."))
                        .await;
                    bot.send_message(chat_id, "Appointment revoked.").await?;
                }
                Err(e) => {
                    error!("revoke of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to revoke the appointment. Try again.")
                        .await?;
                }
            }
        }
        _ if data.starts_with("del_appt:") => {
            let Some(appt_id) = callback_id(&data) else { return Ok(()) };
            confirm(&bot, chat_id, "Delete this appointment permanently?", &format!("del_appt_yes:{appt_id}"))
                .await?;
        }
        _ if data.starts_with("del_appt_yes:") => {
            let (Some(appt_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            match sqlx::query("DELETE FROM appointments WHERE id = $1 AND user_id = $2")
                .bind(appt_id)
                .bind(user_id)
                .execute(&pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Appointment deleted.").await?;
                }
                Err(e) => {
                    error!("delete of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to delete the appointment. Try again.")
                        .await?;
                }
            }
        }
        _ if data.starts_with("accept_sugg:") => {
            let (Some(appt_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            // The suggested pair becomes the schedule; the guard on status
            // makes a stale button press a no-op instead of a bad write.
            let res = sqlx::query(
                "UPDATE appointments \
                 SET previous_date = date, previous_time = time, \
                     date = suggested_date, time = suggested_time, \
                     suggested_date = NULL, suggested_time = NULL, \
                     status = 'approved', updated_at = NOW() \
                 WHERE id = $1 AND user_id = $2 AND status = 'pending reschedule' \
                   AND suggested_date IS NOT NULL AND suggested_time IS NOT NULL",
            )
            .bind(appt_id)
            .bind(user_id)
            .execute(&pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => {
                    notify_admins(
                        &bot,
                        &pool,
                        &format!("✅ The client accepted the suggested time for appointment #{appt_id}."),
                    )
                    .await;
                    bot.send_message(chat_id, "New time confirmed — your appointment is approved. 🎉")
                        .await?;
                }
                Ok(_) => {
                    bot.send_message(chat_id, "This appointment is no longer awaiting your decision.")
                        .await?;
                }
                Err(e) => {
                    error!("accepting suggestion on appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to confirm the new time. Try again.")
                        .await?;
                }
            }
        }
        _ if data.starts_with("decline_sugg:") => {
            let (Some(appt_id), Some(user_id)) = (callback_id(&data), session.user_id) else {
                return Ok(());
            };
            let res = sqlx::query(
                "DELETE FROM appointments \
                 WHERE id = $1 AND user_id = $2 AND status = 'pending reschedule'",
            )
            .bind(appt_id)
            .bind(user_id)
            .execute(&pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => {
                    notify_admins(
                        &bot,
                        &pool,
                        &format!("🗑 The client declined the suggested time for appointment #{appt_id}; the booking was removed."),
                    )
                    .await;
                    bot.send_message(
                        chat_id,
                        "The appointment was removed. You are welcome to book a fresh one.",
                    )
                    .await?;
                }
                Ok(_) => {
                    bot.send_message(chat_id, "This appointment is no longer awaiting your decision.")
                        .await?;
                }
                Err(e) => {
                    error!("declining suggestion on appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to decline the new time. Try again.")
                        .await?;
                }
            }
        }

        // ---------------- Blog ----------------
        _ if data.starts_with("blog:") => {
            let Some(blog_id) = callback_id(&data) else { return Ok(()) };
            show_blog(&bot, chat_id, &pool, blog_id).await?;
        }
        _ if data.starts_with("like:") => {
            let Some(blog_id) = callback_id(&data) else { return Ok(()) };
            match sqlx::query_scalar::<_, i32>(
                "UPDATE blogs SET likes = likes + 1 WHERE id = $1 RETURNING likes",
            )
            .bind(blog_id)
            .fetch_optional(&pool)
            .await
            {
                Ok(Some(likes)) => {
                    bot.send_message(chat_id, format!("Thanks! ❤️ {likes}")).await?;
                }
                Ok(None) => {
                    bot.send_message(chat_id, "That post is gone.").await?;
                }
                Err(e) => {
                    error!("like on blog {blog_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Could not record the like. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("share:") => {
            let Some(blog_id) = callback_id(&data) else { return Ok(()) };
            match sqlx::query("UPDATE blogs SET shares = shares + 1 WHERE id = $1")
                .bind(blog_id)
                .execute(&pool)
                .await
            {
                Ok(_) => {
                    let me = bot.get_me().await?;
                    bot.send_message(
                        chat_id,
                        format!(
                            "Share this post: https://t.me/{}?start=blog_{blog_id}",
                            me.username()
                        ),
                    )
                    .await?;
                }
                Err(e) => {
                    error!("share on blog {blog_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Could not build the share link. Try again.")
                        .await?;
                }
            }
        }
        _ if data.starts_with("comment:") => {
            let Some(blog_id) = callback_id(&data) else { return Ok(()) };
            session.active_blog = Some(blog_id);
            if session.user_id.is_some() {
                session.comment_name = session.display_name.clone();
                session.step = UserStep::CommentText;
                bot.send_message(chat_id, "Your comment:")
                    .reply_markup(cancel_keyboard())
                    .await?;
            } else {
                session.step = UserStep::CommentName;
                bot.send_message(chat_id, "The name to show next to your comment:")
                    .reply_markup(cancel_keyboard())
                    .await?;
            }
        }
        _ if data.starts_with("comments:") => {
            let Some(blog_id) = callback_id(&data) else { return Ok(()) };
            show_blog_comments(&bot, chat_id, &pool, blog_id).await?;
        }
        _ => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

async fn start(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    session: &mut UserSession,
) -> HandlerResult {
    session.step = UserStep::Idle;
    match resolve_identity(pool, chat_id.0).await {
        Some(user) => {
            apply_identity(session, &user);
            if session.role.is_admin() {
                bot.send_message(
                    chat_id,
                    format!("Welcome back, {}! Here is the {CLINIC_NAME} admin console.", user.name),
                )
                .await?;
                admin::show_admin_menu(bot, chat_id).await?;
            } else {
                bot.send_message(
                    chat_id,
                    format!(
                        "Karibu back to {CLINIC_NAME}, {}! How can we help today?",
                        user.name
                    ),
                )
                .await?;
                send_main_menu(bot, chat_id, true).await?;
            }
        }
        None => {
            session.user_id = None;
            session.role = Role::Normal;
            let staged = sqlx::query_scalar::<_, i32>(
                "SELECT id FROM pending_clients WHERE telegram_id = $1",
            )
            .bind(chat_id.0)
            .fetch_optional(pool)
            .await
            .unwrap_or_else(|e| {
                error!("pending-client lookup failed for {}: {e}", chat_id.0);
                None
            });
            let greeting = if staged.is_some() {
                format!(
                    "Karibu to {CLINIC_NAME} — {DOCTOR_NAME}. Your registration is with the \
                     clinic; we'll message you once your account is ready."
                )
            } else {
                format!(
                    "Karibu to {CLINIC_NAME} — {DOCTOR_NAME}. Browse our physiotherapy \
                     services and blog, or register to book an appointment."
                )
            };
            bot.send_message(chat_id, greeting).await?;
            send_main_menu(bot, chat_id, false).await?;
        }
    }
    Ok(())
}

async fn begin_registration(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    session: &mut UserSession,
) -> HandlerResult {
    if session.user_id.is_some() {
        bot.send_message(chat_id, "You already have an account — you are all set.")
            .await?;
        return Ok(());
    }
    let staged = sqlx::query_scalar::<_, i32>("SELECT id FROM pending_clients WHERE telegram_id = $1")
        .bind(chat_id.0)
        .fetch_optional(pool)
        .await
        .unwrap_or_else(|e| {
            error!("pending-client lookup failed for {}: {e}", chat_id.0);
            None
        });
    if staged.is_some() {
        bot.send_message(
            chat_id,
            "Your registration is already with the clinic — we'll message you once your account is ready.",
        )
        .await?;
        return Ok(());
    }
    session.registration = RegistrationDraft::default();
    session.step = UserStep::RegisterName;
    bot.send_message(chat_id, "Let's get you registered. Your full name:")
        .reply_markup(cancel_keyboard())
        .await?;
    Ok(())
}

async fn show_my_appointments(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user_id: i32,
) -> HandlerResult {
    let appointments = match sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments WHERE user_id = $1 ORDER BY date ASC, time ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("appointment list failed for user {user_id}: {e}");
            bot.send_message(chat_id, "⚠️ Could not load your appointments. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if appointments.is_empty() {
        bot.send_message(chat_id, "No appointments yet — tap 📅 Book appointment to make one.")
            .await?;
        return Ok(());
    }

    if appointments
        .iter()
        .any(|a| AppointmentStatus::parse(&a.status).map(|s| s.awaiting_decision()).unwrap_or(false))
    {
        bot.send_message(
            chat_id,
            "📅 The clinic suggested a new time for one of your appointments — see below.",
        )
        .await?;
    }

    for appt in &appointments {
        let status = AppointmentStatus::parse(&appt.status);
        let mut row = Vec::new();
        if status.map(|s| s.awaiting_decision()).unwrap_or(false) {
            row.push(InlineKeyboardButton::callback(
                "✅ Accept".to_string(),
                format!("accept_sugg:{}", appt.id),
            ));
            row.push(InlineKeyboardButton::callback(
                "🚫 Decline".to_string(),
                format!("decline_sugg:{}", appt.id),
            ));
        } else if status.map(|s| s.can_reschedule()).unwrap_or(false) {
            row.push(InlineKeyboardButton::callback(
                "🔁 Reschedule".to_string(),
                format!("resched:{}", appt.id),
            ));
            row.push(InlineKeyboardButton::callback(
                "❌ Revoke".to_string(),
                format!("revoke:{}", appt.id),
            ));
        }
        row.push(InlineKeyboardButton::callback(
            "🗑 Delete".to_string(),
            format!("del_appt:{}", appt.id),
        ));
        bot.send_message(chat_id, render_appointment(appt))
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }
    Ok(())
}

async fn show_testimonials(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    user_id: Option<i32>,
) -> HandlerResult {
    let approved = match sqlx::query_as::<_, Testimonial>(
        "SELECT * FROM testimonials WHERE status = 'approved' ORDER BY created_at DESC LIMIT 5",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("testimonial list failed: {e}");
            bot.send_message(chat_id, "⚠️ Could not load testimonials. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if approved.is_empty() {
        bot.send_message(chat_id, "No testimonials published yet.").await?;
    } else {
        let mut text = String::from("What our patients say:\n");
        for t in &approved {
            text.push_str(&format!("\n“{}”\n— {} ({})\n", t.message, t.name, t.category));
        }
        bot.send_message(chat_id, text).await?;
    }

    let Some(user_id) = user_id else {
        return Ok(());
    };

    let own = sqlx::query_as::<_, Testimonial>(
        "SELECT * FROM testimonials WHERE user_id = $1 ORDER BY created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .unwrap_or_else(|e| {
        error!("own testimonial list failed for user {user_id}: {e}");
        Vec::new()
    });

    for t in &own {
        let text = format!("Your testimonial ({}, {}):\n“{}”", t.category, t.status, t.message);
        let row = vec![
            InlineKeyboardButton::callback("✏️ Edit".to_string(), format!("edit_test:{}", t.id)),
            InlineKeyboardButton::callback("🗑 Delete".to_string(), format!("del_test:{}", t.id)),
        ];
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "➕ Share your experience".to_string(),
        "new_test".to_string(),
    )]]);
    bot.send_message(chat_id, "Would you like to add your own?")
        .reply_markup(keyboard)
        .await?;
    Ok(())
}

async fn show_blog_index(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let blogs = match sqlx::query_as::<_, Blog>(
        "SELECT * FROM blogs ORDER BY created_at DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("blog index failed: {e}");
            bot.send_message(chat_id, "⚠️ Could not load the blog. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if blogs.is_empty() {
        bot.send_message(chat_id, "No posts yet — check back soon.").await?;
        return Ok(());
    }

    let mut text = String::from("📰 Latest from the clinic:\n");
    let mut keyboard = Vec::new();
    for blog in &blogs {
        text.push_str(&format!(
            "\n• {} — {} (❤️ {} · 🔗 {})",
            blog.title,
            fmt_date(blog.created_at.date_naive()),
            blog.likes,
            blog.shares
        ));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("Read: {}", truncate_chars(&blog.title, 32)),
            format!("blog:{}", blog.id),
        )]);
    }
    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

async fn show_blog(bot: &Bot, chat_id: ChatId, pool: &PgPool, blog_id: i32) -> HandlerResult {
    let blog = match sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = $1")
        .bind(blog_id)
        .fetch_optional(pool)
        .await
    {
        Ok(Some(blog)) => blog,
        Ok(None) => {
            bot.send_message(chat_id, "That post is gone.").await?;
            return Ok(());
        }
        Err(e) => {
            error!("blog {blog_id} fetch failed: {e}");
            bot.send_message(chat_id, "⚠️ Could not load the post. Please try again.")
                .await?;
            return Ok(());
        }
    };

    let mut text = format!(
        "{}\n{}\n\n{}",
        blog.title,
        fmt_date(blog.created_at.date_naive()),
        truncate_chars(&blog.content, 3500)
    );
    if let Some(image) = &blog.image_url {
        text.push_str(&format!("\n\n🖼 {image}"));
    }
    text.push_str(&format!("\n\n❤️ {} · 🔗 {}", blog.likes, blog.shares));

    let keyboard = InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("❤️ Like".to_string(), format!("like:{blog_id}")),
            InlineKeyboardButton::callback("🔗 Share".to_string(), format!("share:{blog_id}")),
        ],
        vec![
            InlineKeyboardButton::callback("💬 Comment".to_string(), format!("comment:{blog_id}")),
            InlineKeyboardButton::callback("📖 Comments".to_string(), format!("comments:{blog_id}")),
        ],
    ]);
    bot.send_message(chat_id, text).reply_markup(keyboard).await?;
    Ok(())
}

async fn show_blog_comments(bot: &Bot, chat_id: ChatId, pool: &PgPool, blog_id: i32) -> HandlerResult {
    let comments = match sqlx::query_as::<_, BlogComment>(
        "SELECT * FROM blog_comments WHERE blog_id = $1 AND status = 'approved' \
         ORDER BY created_at DESC LIMIT 10",
    )
    .bind(blog_id)
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("comment list for blog {blog_id} failed: {e}");
            bot.send_message(chat_id, "⚠️ Could not load comments. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if comments.is_empty() {
        bot.send_message(chat_id, "No comments yet — be the first!").await?;
        return Ok(());
    }
    let mut text = String::from("💬 Comments:\n");
    for c in &comments {
        text.push_str(&format!("\n{}: {}\n", c.name, c.comment));
    }
    bot.send_message(chat_id, text).await?;
    Ok(())
}

async fn show_team(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let team = match sqlx::query_as::<_, TeamMember>("SELECT * FROM team ORDER BY id ASC")
        .fetch_all(pool)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("team list failed: {e}");
            bot.send_message(chat_id, "⚠️ Could not load the team. Please try again.")
                .await?;
            return Ok(());
        }
    };

    if team.is_empty() {
        bot.send_message(chat_id, "Team profiles are coming soon.").await?;
        return Ok(());
    }
    let mut text = format!("👥 The {CLINIC_NAME} team:\n");
    for member in &team {
        text.push_str(&format!("\n{} — {}\n{}\n", member.name, member.role, member.bio));
        if let Some(photo) = &member.photo_url {
            text.push_str(&format!("🖼 {photo}\n"));
        }
    }
    bot.send_message(chat_id, text).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Looks up the durable account for a chat. A lookup error is logged and
/// treated as "no account": access stays denied rather than guessed.
pub async fn resolve_identity(pool: &PgPool, telegram_id: i64) -> Option<User> {
    match sqlx::query_as::<_, User>("SELECT * FROM users WHERE telegram_id = $1")
        .bind(telegram_id)
        .fetch_optional(pool)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("identity lookup failed for {telegram_id}: {e}");
            None
        }
    }
}

fn apply_identity(session: &mut UserSession, user: &User) {
    session.user_id = Some(user.id);
    session.role = Role::parse(&user.role);
    session.display_name = user.name.clone();
    session.email = user.email.clone();
}

pub async fn send_main_menu(bot: &Bot, chat_id: ChatId, registered: bool) -> HandlerResult {
    let buttons: Vec<Vec<KeyboardButton>> = if registered {
        vec![
            vec![KeyboardButton::new(BTN_BOOK)],
            vec![KeyboardButton::new(BTN_MY_APPTS)],
            vec![KeyboardButton::new(BTN_TESTIMONIALS), KeyboardButton::new(BTN_BLOG)],
            vec![KeyboardButton::new(BTN_TEAM), KeyboardButton::new(BTN_CONTACT)],
        ]
    } else {
        vec![
            vec![KeyboardButton::new(BTN_REGISTER)],
            vec![KeyboardButton::new(BTN_TESTIMONIALS), KeyboardButton::new(BTN_BLOG)],
            vec![KeyboardButton::new(BTN_TEAM), KeyboardButton::new(BTN_CONTACT)],
        ]
    };
    let keyboard = KeyboardMarkup::new(buttons).resize_keyboard();
    bot.send_message(chat_id, "Choose an option:")
        .reply_markup(ReplyMarkup::Keyboard(keyboard))
        .await?;
    Ok(())
}

pub(crate) fn cancel_keyboard() -> ReplyMarkup {
    let keyboard = KeyboardMarkup::new(vec![vec![KeyboardButton::new(BTN_CANCEL)]]).resize_keyboard();
    ReplyMarkup::Keyboard(keyboard)
}

fn services_keyboard() -> ReplyMarkup {
    let mut buttons: Vec<Vec<KeyboardButton>> =
        SERVICES.iter().map(|s| vec![KeyboardButton::new(*s)]).collect();
    buttons.push(vec![KeyboardButton::new(BTN_CANCEL)]);
    ReplyMarkup::Keyboard(KeyboardMarkup::new(buttons).resize_keyboard())
}

/// Two-tap guard for destructive actions.
pub(crate) async fn confirm(bot: &Bot, chat_id: ChatId, question: &str, yes_data: &str) -> HandlerResult {
    let keyboard = InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Yes".to_string(), yes_data.to_string()),
        InlineKeyboardButton::callback("Cancel".to_string(), "dismiss".to_string()),
    ]]);
    bot.send_message(chat_id, question).reply_markup(keyboard).await?;
    Ok(())
}

pub fn render_appointment(appt: &Appointment) -> String {
    let status = AppointmentStatus::parse(&appt.status)
        .map(|s| s.label().to_string())
        .unwrap_or_else(|| appt.status.clone());
    let mut text = format!(
        "🗓 Appointment #{}\nPatient: {}\nWhatsApp: {}\nService: {}\nWith: {}\nDate: {} at {}\nStatus: {}",
        appt.id,
        appt.patient_name,
        appt.whatsapp,
        appt.service,
        appt.doctor_name,
        fmt_date(appt.date),
        fmt_time(appt.time),
        status
    );
    if let (Some(d), Some(t)) = (appt.previous_date, appt.previous_time) {
        text.push_str(&format!("\nPrevious: {} at {}", fmt_date(d), fmt_time(t)));
    }
    if let (Some(d), Some(t)) = (appt.suggested_date, appt.suggested_time) {
        text.push_str(&format!("\nSuggested: {} at {}", fmt_date(d), fmt_time(t)));
    }
    if let Some(comment) = &appt.admin_comment {
        text.push_str(&format!("\n💬 {comment}"));
    }
    text
}

async fn own_appointment(
    pool: &PgPool,
    appt_id: i32,
    user_id: i32,
) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1 AND user_id = $2")
        .bind(appt_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await
}

/// Best-effort broadcast to every admin account; failures only make noise
/// in the log.
pub async fn notify_admins(bot: &Bot, pool: &PgPool, text: &str) {
    let admins = match sqlx::query_scalar::<_, i64>(
        "SELECT telegram_id FROM users WHERE role IN ('admin', 'superadmin')",
    )
    .fetch_all(pool)
    .await
    {
        Ok(ids) => ids,
        Err(e) => {
            error!("admin lookup for notification failed: {e}");
            return;
        }
    };
    for telegram_id in admins {
        if let Err(e) = bot.send_message(ChatId(telegram_id), text).await {
            error!("failed to notify admin {telegram_id}: {e}");
        }
    }
}

/// Best-effort message to the owner of an appointment.
pub async fn notify_appointment_owner(
    bot: &Bot,
    pool: &PgPool,
    appt_id: i32,
    text: &str,
    keyboard: Option<InlineKeyboardMarkup>,
) {
    let owner = match sqlx::query_scalar::<_, i64>(
        "SELECT u.telegram_id FROM users u JOIN appointments a ON a.user_id = u.id WHERE a.id = $1",
    )
    .bind(appt_id)
    .fetch_optional(pool)
    .await
    {
        Ok(Some(id)) => id,
        Ok(None) => return,
        Err(e) => {
            error!("owner lookup for appointment {appt_id} failed: {e}");
            return;
        }
    };
    let mut request = bot.send_message(ChatId(owner), text);
    if let Some(keyboard) = keyboard {
        request = request.reply_markup(keyboard);
    }
    if let Err(e) = request.await {
        error!("failed to notify client {owner} about appointment {appt_id}: {e}");
    }
}

fn callback_id(data: &str) -> Option<i32> {
    data.split(':').nth(1)?.parse().ok()
}

pub fn fmt_date(date: NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

pub fn fmt_time(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

/// Char-boundary-safe truncation for Telegram's message limit.
pub fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn callback_id_parses_and_rejects() {
        assert_eq!(callback_id("resched:17"), Some(17));
        assert_eq!(callback_id("a_appr:3"), Some(3));
        assert_eq!(callback_id("resched:"), None);
        assert_eq!(callback_id("resched:x"), None);
        assert_eq!(callback_id("resched"), None);
    }

    #[test]
    fn truncation_respects_char_boundaries() {
        assert_eq!(truncate_chars("short", 10), "short");
        assert_eq!(truncate_chars("abcdef", 3), "abc…");
        // Multi-byte content must not split inside a character.
        assert_eq!(truncate_chars("héllo wörld", 4), "héll…");
    }

    #[test]
    fn date_and_time_formatting() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let t = NaiveTime::from_hms_opt(9, 0, 0).unwrap();
        assert_eq!(fmt_date(d), "01 Mar 2025");
        assert_eq!(fmt_time(t), "09:00");
    }
}
