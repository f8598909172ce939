//! Admin console flows. Everything here is reached through role-gated
//! dispatch in `handlers`; no function in this module is wired to a chat
//! whose session does not carry an admin role.

use chrono::{Local, NaiveDate, NaiveTime};
use log::{error, info};
use sqlx::PgPool;
use teloxide::{
    prelude::*,
    types::{
        InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup, Message,
        ReplyMarkup,
    },
};
use url::Url;

use crate::handlers::{
    cancel_keyboard, confirm, fmt_date, fmt_time, notify_appointment_owner, render_appointment,
    truncate_chars, HandlerResult, UserSession, UserStep, CLINIC_NAME,
};
use crate::models::{
    Appointment, AppointmentStatus, Blog, BlogComment, Contact, PendingClient, TeamMember,
    Testimonial, User,
};
use crate::phone;

pub const BTN_ADMIN_APPTS: &str = "📋 Appointments";
pub const BTN_ADMIN_DASH: &str = "📊 Dashboard";
pub const BTN_ADMIN_CLIENTS: &str = "🧑‍⚕️ Pending clients";
pub const BTN_ADMIN_USERS: &str = "👤 Registered users";
pub const BTN_ADMIN_CONTACTS: &str = "📨 Contact inbox";
pub const BTN_ADMIN_BLOGS: &str = "📰 Manage blogs";
pub const BTN_ADMIN_TESTIMONIALS: &str = "⭐ Review testimonials";
pub const BTN_ADMIN_TEAM: &str = "👥 Manage team";

const PER_PAGE: usize = 3;
const USERS_PER_PAGE: usize = 5;

pub fn is_admin_label(text: &str) -> bool {
    matches!(
        text,
        BTN_ADMIN_APPTS
            | BTN_ADMIN_DASH
            | BTN_ADMIN_CLIENTS
            | BTN_ADMIN_USERS
            | BTN_ADMIN_CONTACTS
            | BTN_ADMIN_BLOGS
            | BTN_ADMIN_TESTIMONIALS
            | BTN_ADMIN_TEAM
    )
}

pub fn is_admin_step(step: UserStep) -> bool {
    matches!(
        step,
        UserStep::AdminSuggestDate
            | UserStep::AdminSuggestTime
            | UserStep::AdminComment
            | UserStep::AdminDashSearch
            | UserStep::AdminTeamName
            | UserStep::AdminTeamRole
            | UserStep::AdminTeamBio
            | UserStep::AdminTeamPhoto
            | UserStep::AdminBlogTitle
            | UserStep::AdminBlogContent
            | UserStep::AdminBlogImage
    )
}

pub async fn show_admin_menu(bot: &Bot, chat_id: ChatId) -> HandlerResult {
    let buttons: Vec<Vec<KeyboardButton>> = vec![
        vec![KeyboardButton::new(BTN_ADMIN_APPTS), KeyboardButton::new(BTN_ADMIN_DASH)],
        vec![KeyboardButton::new(BTN_ADMIN_CLIENTS), KeyboardButton::new(BTN_ADMIN_USERS)],
        vec![KeyboardButton::new(BTN_ADMIN_CONTACTS), KeyboardButton::new(BTN_ADMIN_BLOGS)],
        vec![KeyboardButton::new(BTN_ADMIN_TESTIMONIALS), KeyboardButton::new(BTN_ADMIN_TEAM)],
    ];
    let keyboard = KeyboardMarkup::new(buttons).resize_keyboard();
    bot.send_message(chat_id, "Admin console — choose a section:")
        .reply_markup(ReplyMarkup::Keyboard(keyboard))
        .await?;
    Ok(())
}

pub async fn handle_admin_label(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    session: &mut UserSession,
    text: &str,
) -> HandlerResult {
    session.step = UserStep::Idle;
    match text {
        BTN_ADMIN_APPTS => show_appointments_page(bot, chat_id, pool, 0).await,
        BTN_ADMIN_DASH => show_dashboard(bot, chat_id, pool, session, None).await,
        BTN_ADMIN_CLIENTS => show_pending_clients(bot, chat_id, pool).await,
        BTN_ADMIN_USERS => show_users_page(bot, chat_id, pool, 0).await,
        BTN_ADMIN_CONTACTS => show_contacts_page(bot, chat_id, pool, 0).await,
        BTN_ADMIN_BLOGS => show_blogs_admin(bot, chat_id, pool).await,
        BTN_ADMIN_TESTIMONIALS => show_testimonials_admin(bot, chat_id, pool).await,
        BTN_ADMIN_TEAM => show_team_admin(bot, chat_id, pool).await,
        _ => Ok(()),
    }
}

pub async fn handle_admin_step(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    session: &mut UserSession,
    text: &str,
) -> HandlerResult {
    match session.step {
        // ---------------- Suggest a new date/time ----------------
        UserStep::AdminSuggestDate => {
            match NaiveDate::parse_from_str(text, "%Y-%m-%d") {
                Ok(date) if date >= Local::now().date_naive() => {
                    session.suggest_date = Some(date);
                    session.step = UserStep::AdminSuggestTime;
                    bot.send_message(chat_id, "Suggested time (HH:MM):").await?;
                }
                Ok(_) => {
                    bot.send_message(chat_id, "That date is in the past. Pick another one:")
                        .await?;
                }
                Err(_) => {
                    bot.send_message(chat_id, "Please send the date as YYYY-MM-DD:").await?;
                }
            }
        }
        UserStep::AdminSuggestTime => {
            let Ok(time) = NaiveTime::parse_from_str(text, "%H:%M") else {
                bot.send_message(chat_id, "Please send the time as HH:MM:").await?;
                return Ok(());
            };
            let (Some(appt_id), Some(date)) = (session.active_appointment, session.suggest_date)
            else {
                session.step = UserStep::Idle;
                return show_admin_menu(bot, chat_id).await;
            };
            let res = sqlx::query(
                "UPDATE appointments \
                 SET status = 'pending reschedule', suggested_date = $1, suggested_time = $2, \
                     admin_comment = 'Suggested new date/time, awaiting client confirmation', \
                     updated_at = NOW() \
                 WHERE id = $3 AND status <> 'revoked'",
            )
            .bind(date)
            .bind(time)
            .bind(appt_id)
            .execute(pool)
            .await;
            match res {
                Ok(done) if done.rows_affected() > 0 => {
                    session.step = UserStep::Idle;
                    session.active_appointment = None;
                    session.suggest_date = None;
                    let keyboard = InlineKeyboardMarkup::new(vec![vec![
                        InlineKeyboardButton::callback(
                            "✅ Accept".to_string(),
                            format!("accept_sugg:{appt_id}"),
                        ),
                        InlineKeyboardButton::callback(
                            "🚫 Decline".to_string(),
                            format!("decline_sugg:{appt_id}"),
                        ),
                    ]]);
                    notify_appointment_owner(
                        bot,
                        pool,
                        appt_id,
                        &format!(
                            "📅 {CLINIC_NAME} suggests moving your appointment to {} at {}. \
                             Do you accept the new time?",
                            fmt_date(date),
                            fmt_time(time)
                        ),
                        Some(keyboard),
                    )
                    .await;
                    bot.send_message(chat_id, "Suggestion sent — awaiting the client's decision.")
                        .await?;
                    show_admin_menu(bot, chat_id).await?;
                }
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.active_appointment = None;
                    session.suggest_date = None;
                    bot.send_message(chat_id, "This appointment is revoked and cannot be rescheduled.")
                        .await?;
                    show_admin_menu(bot, chat_id).await?;
                }
                Err(e) => {
                    error!("suggesting reschedule on appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to save the suggestion. Send the time again.")
                        .await?;
                }
            }
        }

        // ---------------- Free-text comment on an appointment ----------------
        UserStep::AdminComment => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Please write a comment:").await?;
                return Ok(());
            }
            let Some(appt_id) = session.active_appointment else {
                session.step = UserStep::Idle;
                return show_admin_menu(bot, chat_id).await;
            };
            match sqlx::query(
                "UPDATE appointments SET admin_comment = $1, updated_at = NOW() WHERE id = $2",
            )
            .bind(text)
            .bind(appt_id)
            .execute(pool)
            .await
            {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.active_appointment = None;
                    bot.send_message(chat_id, "Comment saved.").await?;
                    show_admin_menu(bot, chat_id).await?;
                }
                Err(e) => {
                    error!("comment on appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to save the comment. Send it again.")
                        .await?;
                }
            }
        }

        UserStep::AdminDashSearch => {
            session.step = UserStep::Idle;
            show_dashboard(bot, chat_id, pool, session, Some(text)).await?;
        }

        // ---------------- Team member form ----------------
        UserStep::AdminTeamName => {
            if text.len() < 2 {
                bot.send_message(chat_id, "The member's name must have at least 2 characters:")
                    .await?;
                return Ok(());
            }
            session.team.name = text.to_string();
            session.step = UserStep::AdminTeamRole;
            bot.send_message(chat_id, "Their role at the clinic (e.g. Lead Physiotherapist):")
                .await?;
        }
        UserStep::AdminTeamRole => {
            if text.len() < 2 {
                bot.send_message(chat_id, "Please enter the role:").await?;
                return Ok(());
            }
            session.team.role = text.to_string();
            session.step = UserStep::AdminTeamBio;
            bot.send_message(chat_id, "A short bio:").await?;
        }
        UserStep::AdminTeamBio => {
            if text.len() < 5 {
                bot.send_message(chat_id, "A few more words for the bio, please:").await?;
                return Ok(());
            }
            session.team.bio = text.to_string();
            session.step = UserStep::AdminTeamPhoto;
            bot.send_message(chat_id, "A photo URL (or send `skip`):").await?;
        }
        UserStep::AdminTeamPhoto => {
            let photo_url = if text.eq_ignore_ascii_case("skip") {
                None
            } else {
                match Url::parse(text) {
                    Ok(url) => Some(url.to_string()),
                    Err(e) => {
                        info!("rejected team photo url {text:?}: {e}");
                        bot.send_message(chat_id, "That is not a valid URL. Send another one or `skip`:")
                            .await?;
                        return Ok(());
                    }
                }
            };
            let team = &session.team;
            let res = if let Some(member_id) = team.editing {
                sqlx::query(
                    "UPDATE team SET name = $1, role = $2, bio = $3, \
                     photo_url = COALESCE($4, photo_url) WHERE id = $5",
                )
                .bind(&team.name)
                .bind(&team.role)
                .bind(&team.bio)
                .bind(&photo_url)
                .bind(member_id)
                .execute(pool)
                .await
            } else {
                sqlx::query(
                    "INSERT INTO team (name, role, bio, photo_url) VALUES ($1, $2, $3, $4)",
                )
                .bind(&team.name)
                .bind(&team.role)
                .bind(&team.bio)
                .bind(&photo_url)
                .execute(pool)
                .await
            };
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.team = Default::default();
                    bot.send_message(chat_id, "Team member saved.").await?;
                    show_admin_menu(bot, chat_id).await?;
                }
                Err(e) => {
                    error!("team member save failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to save the member. Send the photo URL again.")
                        .await?;
                }
            }
        }

        // ---------------- Blog post form ----------------
        UserStep::AdminBlogTitle => {
            if text.len() < 3 {
                bot.send_message(chat_id, "The title must have at least 3 characters:").await?;
                return Ok(());
            }
            session.blog.title = text.to_string();
            session.step = UserStep::AdminBlogContent;
            bot.send_message(chat_id, "The post content, in one message:").await?;
        }
        UserStep::AdminBlogContent => {
            if text.len() < 20 {
                bot.send_message(chat_id, "The post looks too short — send the full content:")
                    .await?;
                return Ok(());
            }
            session.blog.content = text.to_string();
            session.step = UserStep::AdminBlogImage;
            bot.send_message(chat_id, "A cover image URL (or send `skip`):").await?;
        }
        UserStep::AdminBlogImage => {
            let image_url = if text.eq_ignore_ascii_case("skip") {
                None
            } else {
                match Url::parse(text) {
                    Ok(url) => Some(url.to_string()),
                    Err(e) => {
                        info!("rejected blog image url {text:?}: {e}");
                        bot.send_message(chat_id, "That is not a valid URL. Send another one or `skip`:")
                            .await?;
                        return Ok(());
                    }
                }
            };
            let blog = &session.blog;
            let res = if let Some(blog_id) = blog.editing {
                sqlx::query(
                    "UPDATE blogs SET title = $1, content = $2, \
                     image_url = COALESCE($3, image_url) WHERE id = $4",
                )
                .bind(&blog.title)
                .bind(&blog.content)
                .bind(&image_url)
                .bind(blog_id)
                .execute(pool)
                .await
            } else {
                sqlx::query("INSERT INTO blogs (title, content, image_url) VALUES ($1, $2, $3)")
                    .bind(&blog.title)
                    .bind(&blog.content)
                    .bind(&image_url)
                    .execute(pool)
                    .await
            };
            match res {
                Ok(_) => {
                    session.step = UserStep::Idle;
                    session.blog = Default::default();
                    bot.send_message(chat_id, "Blog post saved.").await?;
                    show_admin_menu(bot, chat_id).await?;
                }
                Err(e) => {
                    error!("blog post save failed: {e}");
                    bot.send_message(chat_id, "⚠️ Failed to save the post. Send the image URL again.")
                        .await?;
                }
            }
        }

        _ => {
            session.step = UserStep::Idle;
            show_admin_menu(bot, chat_id).await?;
        }
    }
    Ok(())
}

pub async fn handle_admin_callback(
    bot: &Bot,
    chat_id: ChatId,
    msg: &Message,
    pool: &PgPool,
    session: &mut UserSession,
    data: &str,
) -> HandlerResult {
    match data {
        // ---------------- Appointment management ----------------
        _ if data.starts_with("a_page:") => {
            let Some(page) = callback_page(data) else { return Ok(()) };
            show_appointments_page(bot, chat_id, pool, page).await?;
        }
        _ if data.starts_with("a_appr:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            let Some(appt) = appointment_by_id(pool, appt_id).await? else {
                bot.send_message(chat_id, "That appointment no longer exists.").await?;
                return Ok(());
            };
            let status = AppointmentStatus::parse(&appt.status);
            if !status.map(|s| s.can_approve()).unwrap_or(true) {
                bot.send_message(chat_id, "Already approved or revoked.").await?;
                return Ok(());
            }
            match sqlx::query(
                "UPDATE appointments \
                 SET status = 'approved', admin_comment = 'Approved ✅', updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(appt_id)
            .execute(pool)
            .await
            {
                Ok(_) => {
                    notify_appointment_owner(
                        bot,
                        pool,
                        appt_id,
                        &format!(
                            "🎉 Your appointment for {} on {} at {} was approved.",
                            appt.service,
                            fmt_date(appt.date),
                            fmt_time(appt.time)
                        ),
                        None,
                    )
                    .await;
                    bot.send_message(chat_id, format!("✅ Appointment #{appt_id} approved."))
                        .await?;
                }
                Err(e) => {
                    error!("approve of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_sugg:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            let Some(appt) = appointment_by_id(pool, appt_id).await? else {
                bot.send_message(chat_id, "That appointment no longer exists.").await?;
                return Ok(());
            };
            if AppointmentStatus::parse(&appt.status) == Some(AppointmentStatus::Revoked) {
                bot.send_message(chat_id, "A revoked appointment cannot be rescheduled.").await?;
                return Ok(());
            }
            session.active_appointment = Some(appt_id);
            session.suggest_date = None;
            session.step = UserStep::AdminSuggestDate;
            bot.send_message(
                chat_id,
                format!(
                    "Current schedule: {} at {}. Suggested date (YYYY-MM-DD):",
                    fmt_date(appt.date),
                    fmt_time(appt.time)
                ),
            )
            .reply_markup(cancel_keyboard())
            .await?;
        }
        _ if data.starts_with("a_com:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            session.active_appointment = Some(appt_id);
            session.step = UserStep::AdminComment;
            bot.send_message(chat_id, "Write your comment for this appointment:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("a_revk:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            let Some(appt) = appointment_by_id(pool, appt_id).await? else {
                bot.send_message(chat_id, "That appointment no longer exists.").await?;
                return Ok(());
            };
            if AppointmentStatus::parse(&appt.status) == Some(AppointmentStatus::Revoked) {
                bot.send_message(chat_id, "This appointment is already revoked.").await?;
                return Ok(());
            }
            match sqlx::query(
                "UPDATE appointments \
                 SET status = 'revoked', admin_comment = 'Revoked by admin', updated_at = NOW() \
                 WHERE id = $1",
            )
            .bind(appt_id)
            .execute(pool)
            .await
            {
                Ok(_) => {
                    notify_appointment_owner(
                        bot,
                        pool,
                        appt_id,
                        &format!(
                            "We are sorry — your appointment for {} on {} at {} was revoked. \
                             Please contact the clinic or book another time.",
                            appt.service,
                            fmt_date(appt.date),
                            fmt_time(appt.time)
                        ),
                        None,
                    )
                    .await;
                    bot.send_message(chat_id, format!("❌ Appointment #{appt_id} revoked."))
                        .await?;
                }
                Err(e) => {
                    error!("revoke of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_del_yes:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM appointments WHERE id = $1")
                .bind(appt_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Appointment deleted.").await?;
                }
                Err(e) => {
                    error!("delete of appointment {appt_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_del:") => {
            let Some(appt_id) = callback_id(data) else { return Ok(()) };
            confirm(bot, chat_id, "Delete this appointment permanently?", &format!("a_del_yes:{appt_id}"))
                .await?;
        }

        // ---------------- Dashboard ----------------
        _ if data.starts_with("a_dash:") => {
            if let Some(filter) = data.split(':').nth(1) {
                session.dash_filter = Some(filter.to_string());
            }
            show_dashboard(bot, chat_id, pool, session, None).await?;
        }
        "a_dash_search" => {
            session.step = UserStep::AdminDashSearch;
            bot.send_message(chat_id, "Search upcoming appointments by name, phone, or service:")
                .reply_markup(cancel_keyboard())
                .await?;
        }

        // ---------------- Pending clients & users ----------------
        _ if data.starts_with("a_promote_yes:") => {
            let Some(client_id) = callback_id(data) else { return Ok(()) };
            let staged = sqlx::query_as::<_, PendingClient>(
                "SELECT * FROM pending_clients WHERE id = $1",
            )
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
            let Some(staged) = staged else {
                bot.edit_message_text(chat_id, msg.id, "Already promoted — nothing to do.")
                    .await?;
                return Ok(());
            };
            match promote_client(pool, &staged).await {
                Ok(user_id) => {
                    info!("pending client {} promoted to user {user_id}", staged.id);
                    // Credential-free welcome; the staged record never travels on.
                    if let Err(e) = bot
                        .send_message(
                            ChatId(staged.telegram_id),
                            format!(
                                "🎉 {}, your {CLINIC_NAME} account is ready. Send /start to sign in \
                                 and book your first appointment.",
                                staged.name
                            ),
                        )
                        .await
                    {
                        error!("failed to welcome promoted client {}: {e}", staged.telegram_id);
                    }
                    bot.edit_message_text(
                        chat_id,
                        msg.id,
                        format!("Account created for {} and the client was notified.", staged.name),
                    )
                    .await?;
                }
                Err(e) => {
                    error!("promotion of pending client {} failed: {e}", staged.id);
                    bot.send_message(
                        chat_id,
                        "⚠️ Failed to create the account. The registration is kept so you can retry.",
                    )
                    .await?;
                }
            }
        }
        _ if data.starts_with("a_promote:") => {
            let Some(client_id) = callback_id(data) else { return Ok(()) };
            let staged = sqlx::query_as::<_, PendingClient>(
                "SELECT * FROM pending_clients WHERE id = $1",
            )
            .bind(client_id)
            .fetch_optional(pool)
            .await?;
            let Some(staged) = staged else {
                bot.send_message(chat_id, "Already promoted — nothing to do.").await?;
                return Ok(());
            };
            confirm(
                bot,
                chat_id,
                &format!("Create account for {}?", staged.name),
                &format!("a_promote_yes:{client_id}"),
            )
            .await?;
        }
        _ if data.starts_with("a_upage:") => {
            let Some(page) = callback_page(data) else { return Ok(()) };
            show_users_page(bot, chat_id, pool, page).await?;
        }
        _ if data.starts_with("a_udel_yes:") => {
            let Some(user_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM users WHERE id = $1")
                .bind(user_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "User deleted.").await?;
                }
                Err(e) => {
                    error!("delete of user {user_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_udel:") => {
            let Some(user_id) = callback_id(data) else { return Ok(()) };
            confirm(
                bot,
                chat_id,
                "Delete this user and everything they own?",
                &format!("a_udel_yes:{user_id}"),
            )
            .await?;
        }

        // ---------------- Contact inbox ----------------
        _ if data.starts_with("a_ctpage:") => {
            let Some(page) = callback_page(data) else { return Ok(()) };
            show_contacts_page(bot, chat_id, pool, page).await?;
        }
        _ if data.starts_with("a_contact:") => {
            let Some(contact_id) = callback_id(data) else { return Ok(()) };
            let contact = sqlx::query_as::<_, Contact>("SELECT * FROM contacts WHERE id = $1")
                .bind(contact_id)
                .fetch_optional(pool)
                .await?;
            let Some(contact) = contact else {
                bot.send_message(chat_id, "That message is gone.").await?;
                return Ok(());
            };
            let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
                "🗑 Delete".to_string(),
                format!("a_cdel:{contact_id}"),
            )]]);
            bot.send_message(chat_id, render_contact(&contact, false))
                .reply_markup(keyboard)
                .await?;
        }
        _ if data.starts_with("a_cdel_yes:") => {
            let Some(contact_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM contacts WHERE id = $1")
                .bind(contact_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Message deleted.").await?;
                }
                Err(e) => {
                    error!("delete of contact {contact_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_cdel:") => {
            let Some(contact_id) = callback_id(data) else { return Ok(()) };
            confirm(bot, chat_id, "Delete this message?", &format!("a_cdel_yes:{contact_id}"))
                .await?;
        }

        // ---------------- Team ----------------
        "a_tadd" => {
            session.team = Default::default();
            session.step = UserStep::AdminTeamName;
            bot.send_message(chat_id, "New team member — their name:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("a_tedit:") => {
            let Some(member_id) = callback_id(data) else { return Ok(()) };
            let member = sqlx::query_as::<_, TeamMember>("SELECT * FROM team WHERE id = $1")
                .bind(member_id)
                .fetch_optional(pool)
                .await?;
            if member.is_none() {
                bot.send_message(chat_id, "That team member is gone.").await?;
                return Ok(());
            }
            session.team = Default::default();
            session.team.editing = Some(member_id);
            session.step = UserStep::AdminTeamName;
            bot.send_message(chat_id, "Updated name for this member:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("a_tdel_yes:") => {
            let Some(member_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM team WHERE id = $1")
                .bind(member_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Team member removed.").await?;
                }
                Err(e) => {
                    error!("delete of team member {member_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_tdel:") => {
            let Some(member_id) = callback_id(data) else { return Ok(()) };
            confirm(bot, chat_id, "Delete this team member?", &format!("a_tdel_yes:{member_id}"))
                .await?;
        }

        // ---------------- Blogs & comment moderation ----------------
        "a_badd" => {
            session.blog = Default::default();
            session.step = UserStep::AdminBlogTitle;
            bot.send_message(chat_id, "New post — the title:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("a_bedit:") => {
            let Some(blog_id) = callback_id(data) else { return Ok(()) };
            let blog = sqlx::query_as::<_, Blog>("SELECT * FROM blogs WHERE id = $1")
                .bind(blog_id)
                .fetch_optional(pool)
                .await?;
            if blog.is_none() {
                bot.send_message(chat_id, "That post is gone.").await?;
                return Ok(());
            }
            session.blog = Default::default();
            session.blog.editing = Some(blog_id);
            session.step = UserStep::AdminBlogTitle;
            bot.send_message(chat_id, "Updated title for this post:")
                .reply_markup(cancel_keyboard())
                .await?;
        }
        _ if data.starts_with("a_bdel_yes:") => {
            let Some(blog_id) = callback_id(data) else { return Ok(()) };
            // Comments go with the post (FK cascade).
            match sqlx::query("DELETE FROM blogs WHERE id = $1")
                .bind(blog_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Post and its comments deleted.")
                        .await?;
                }
                Err(e) => {
                    error!("delete of blog {blog_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }
        _ if data.starts_with("a_bdel:") => {
            let Some(blog_id) = callback_id(data) else { return Ok(()) };
            confirm(
                bot,
                chat_id,
                "Delete this post and all its comments?",
                &format!("a_bdel_yes:{blog_id}"),
            )
            .await?;
        }
        _ if data.starts_with("a_bcomm:") => {
            let Some(blog_id) = callback_id(data) else { return Ok(()) };
            show_blog_comments_admin(bot, chat_id, pool, blog_id).await?;
        }
        _ if data.starts_with("a_okc:") => {
            let Some(comment_id) = callback_id(data) else { return Ok(()) };
            moderate_comment(bot, chat_id, pool, comment_id, "approved").await?;
        }
        _ if data.starts_with("a_noc:") => {
            let Some(comment_id) = callback_id(data) else { return Ok(()) };
            moderate_comment(bot, chat_id, pool, comment_id, "pending").await?;
        }
        _ if data.starts_with("a_delc:") => {
            let Some(comment_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM blog_comments WHERE id = $1")
                .bind(comment_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Comment deleted.").await?;
                }
                Err(e) => {
                    error!("delete of comment {comment_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }

        // ---------------- Testimonial moderation ----------------
        _ if data.starts_with("a_okt:") => {
            let Some(test_id) = callback_id(data) else { return Ok(()) };
            moderate_testimonial(bot, chat_id, pool, test_id, "approved").await?;
        }
        _ if data.starts_with("a_not:") => {
            let Some(test_id) = callback_id(data) else { return Ok(()) };
            moderate_testimonial(bot, chat_id, pool, test_id, "pending").await?;
        }
        _ if data.starts_with("a_delt:") => {
            let Some(test_id) = callback_id(data) else { return Ok(()) };
            match sqlx::query("DELETE FROM testimonials WHERE id = $1")
                .bind(test_id)
                .execute(pool)
                .await
            {
                Ok(_) => {
                    bot.edit_message_text(chat_id, msg.id, "Testimonial deleted.").await?;
                }
                Err(e) => {
                    error!("delete of testimonial {test_id} failed: {e}");
                    bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
                }
            }
        }

        _ => {}
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

async fn show_appointments_page(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    page: usize,
) -> HandlerResult {
    let appointments = match sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("admin appointment list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load appointments. Try again.").await?;
            return Ok(());
        }
    };

    if appointments.is_empty() {
        bot.send_message(chat_id, "No appointments found.").await?;
        return Ok(());
    }

    let total_pages = (appointments.len() + PER_PAGE - 1) / PER_PAGE;
    let page = page.min(total_pages - 1);
    let start = page * PER_PAGE;
    let end = std::cmp::min(start + PER_PAGE, appointments.len());

    let mut text = format!("📋 Appointments — page {}/{}\n", page + 1, total_pages);
    let mut keyboard = Vec::new();
    for appt in &appointments[start..end] {
        text.push('\n');
        text.push_str(&render_appointment(appt));
        text.push('\n');

        let status = AppointmentStatus::parse(&appt.status);
        let mut row = vec![InlineKeyboardButton::callback(
            format!("🔢 #{}", appt.id),
            "ignore".to_string(),
        )];
        if status.map(|s| s.can_approve()).unwrap_or(false) {
            row.push(InlineKeyboardButton::callback(
                "✅ Approve".to_string(),
                format!("a_appr:{}", appt.id),
            ));
        }
        if status.map(|s| s.can_reschedule()).unwrap_or(false) {
            row.push(InlineKeyboardButton::callback(
                "🔁 Suggest".to_string(),
                format!("a_sugg:{}", appt.id),
            ));
        }
        keyboard.push(row);
        keyboard.push(vec![
            InlineKeyboardButton::callback("💬 Comment".to_string(), format!("a_com:{}", appt.id)),
            InlineKeyboardButton::callback("❌ Revoke".to_string(), format!("a_revk:{}", appt.id)),
            InlineKeyboardButton::callback("🗑 Delete".to_string(), format!("a_del:{}", appt.id)),
        ]);
    }

    if appointments.len() > PER_PAGE {
        keyboard.push(nav_row("a_page", page, total_pages));
    }

    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

async fn show_dashboard(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    session: &UserSession,
    search: Option<&str>,
) -> HandlerResult {
    let upcoming = match sqlx::query_as::<_, Appointment>(
        "SELECT * FROM appointments \
         WHERE status IN ('approved', 'rescheduled') AND date >= CURRENT_DATE \
         ORDER BY date ASC, time ASC",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("dashboard query failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load the dashboard. Try again.").await?;
            return Ok(());
        }
    };

    let mut shown: Vec<&Appointment> = upcoming.iter().collect();
    if let Some(filter) = session.dash_filter.as_deref() {
        if filter != "all" {
            shown.retain(|a| a.status.eq_ignore_ascii_case(filter));
        }
    }
    if let Some(needle) = search {
        let needle = needle.to_lowercase();
        shown.retain(|a| {
            a.patient_name.to_lowercase().contains(&needle)
                || a.service.to_lowercase().contains(&needle)
                || a.whatsapp.contains(&needle)
        });
    }

    let admin_name = if session.display_name.is_empty() {
        "Admin"
    } else {
        session.display_name.as_str()
    };

    if shown.is_empty() {
        bot.send_message(chat_id, "No upcoming appointments match your criteria.").await?;
    } else {
        bot.send_message(chat_id, format!("📊 Upcoming engagements: {}", shown.len()))
            .await?;
    }

    for appt in shown {
        let status = AppointmentStatus::parse(&appt.status)
            .map(|s| s.label().to_string())
            .unwrap_or_else(|| appt.status.clone());
        let text = format!(
            "{}\n📞 {}\nService: {}\n{} at {}\nStatus: {}",
            appt.patient_name,
            phone::dial_link(&appt.whatsapp),
            appt.service,
            fmt_date(appt.date),
            fmt_time(appt.time),
            status
        );
        let engage = format!(
            "Hello {}, this is {} from our clinic. Your appointment for {} on {} at {}.",
            appt.patient_name,
            admin_name,
            appt.service,
            fmt_date(appt.date),
            fmt_time(appt.time)
        );
        let mut keyboard = Vec::new();
        if let Some(link) = phone::whatsapp_link(&appt.whatsapp, &engage) {
            keyboard.push(vec![InlineKeyboardButton::url(
                "💬 Engage (WhatsApp)".to_string(),
                link,
            )]);
        }
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(keyboard))
            .await?;
    }

    let controls = InlineKeyboardMarkup::new(vec![
        vec![
            InlineKeyboardButton::callback("All".to_string(), "a_dash:all".to_string()),
            InlineKeyboardButton::callback("Approved".to_string(), "a_dash:approved".to_string()),
            InlineKeyboardButton::callback("Rescheduled".to_string(), "a_dash:rescheduled".to_string()),
        ],
        vec![InlineKeyboardButton::callback("🔍 Search".to_string(), "a_dash_search".to_string())],
    ]);
    bot.send_message(chat_id, "Filter or search:")
        .reply_markup(controls)
        .await?;
    Ok(())
}

async fn show_pending_clients(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let clients = match sqlx::query_as::<_, PendingClient>(
        "SELECT * FROM pending_clients ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("pending client list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load pending clients. Try again.").await?;
            return Ok(());
        }
    };

    if clients.is_empty() {
        bot.send_message(chat_id, "No pending clients.").await?;
        return Ok(());
    }

    for client in &clients {
        let email = client.email.as_deref().unwrap_or("—");
        let text = format!(
            "🧑‍⚕️ {}\nEmail: {}\nPhone: {}\nAge: {}\nLocation: {}",
            client.name, email, client.phone, client.age, client.location
        );
        let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
            "Create account".to_string(),
            format!("a_promote:{}", client.id),
        )]]);
        bot.send_message(chat_id, text).reply_markup(keyboard).await?;
    }
    Ok(())
}

async fn show_users_page(bot: &Bot, chat_id: ChatId, pool: &PgPool, page: usize) -> HandlerResult {
    let users = match sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY id ASC")
        .fetch_all(pool)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("user list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load users. Try again.").await?;
            return Ok(());
        }
    };

    if users.is_empty() {
        bot.send_message(chat_id, "No users found.").await?;
        return Ok(());
    }

    let total_pages = (users.len() + USERS_PER_PAGE - 1) / USERS_PER_PAGE;
    let page = page.min(total_pages - 1);
    let start = page * USERS_PER_PAGE;
    let end = std::cmp::min(start + USERS_PER_PAGE, users.len());

    let mut text = format!("👤 Registered users — page {}/{}\n", page + 1, total_pages);
    let mut keyboard = Vec::new();
    for user in &users[start..end] {
        let email = user.email.as_deref().unwrap_or("—");
        text.push_str(&format!(
            "\n#{} {} — {} ({})\n{}\n",
            user.id, user.name, user.role, email, user.phone
        ));
        keyboard.push(vec![InlineKeyboardButton::callback(
            format!("🗑 Delete {}", user.name),
            format!("a_udel:{}", user.id),
        )]);
    }
    if users.len() > USERS_PER_PAGE {
        keyboard.push(nav_row("a_upage", page, total_pages));
    }
    bot.send_message(chat_id, text)
        .reply_markup(InlineKeyboardMarkup::new(keyboard))
        .await?;
    Ok(())
}

async fn show_contacts_page(bot: &Bot, chat_id: ChatId, pool: &PgPool, page: usize) -> HandlerResult {
    let contacts = match sqlx::query_as::<_, Contact>(
        "SELECT * FROM contacts ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("contact list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load contact messages. Try again.").await?;
            return Ok(());
        }
    };

    if contacts.is_empty() {
        bot.send_message(chat_id, "No contact messages yet.").await?;
        return Ok(());
    }

    let total_pages = (contacts.len() + PER_PAGE - 1) / PER_PAGE;
    let page = page.min(total_pages - 1);
    let start = page * PER_PAGE;
    let end = std::cmp::min(start + PER_PAGE, contacts.len());

    for contact in &contacts[start..end] {
        let (_, truncated) = truncate_words(&contact.message, 15);
        let mut row = Vec::new();
        if truncated {
            row.push(InlineKeyboardButton::callback(
                "Read more".to_string(),
                format!("a_contact:{}", contact.id),
            ));
        }
        row.push(InlineKeyboardButton::callback(
            "🗑 Delete".to_string(),
            format!("a_cdel:{}", contact.id),
        ));
        bot.send_message(chat_id, render_contact(contact, true))
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }

    if contacts.len() > PER_PAGE {
        let keyboard = InlineKeyboardMarkup::new(vec![nav_row("a_ctpage", page, total_pages)]);
        bot.send_message(chat_id, format!("Page {}/{}", page + 1, total_pages))
            .reply_markup(keyboard)
            .await?;
    }
    Ok(())
}

async fn show_team_admin(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let team = match sqlx::query_as::<_, TeamMember>("SELECT * FROM team ORDER BY id ASC")
        .fetch_all(pool)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("team list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load the team. Try again.").await?;
            return Ok(());
        }
    };

    for member in &team {
        let mut text = format!("{} — {}\n{}", member.name, member.role, member.bio);
        if let Some(photo) = &member.photo_url {
            text.push_str(&format!("\n🖼 {photo}"));
        }
        let row = vec![
            InlineKeyboardButton::callback("✏️ Edit".to_string(), format!("a_tedit:{}", member.id)),
            InlineKeyboardButton::callback("🗑 Delete".to_string(), format!("a_tdel:{}", member.id)),
        ];
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "➕ Add member".to_string(),
        "a_tadd".to_string(),
    )]]);
    let intro = if team.is_empty() {
        "No team members yet."
    } else {
        "Manage the team:"
    };
    bot.send_message(chat_id, intro).reply_markup(keyboard).await?;
    Ok(())
}

async fn show_blogs_admin(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let blogs = match sqlx::query_as::<_, Blog>("SELECT * FROM blogs ORDER BY created_at DESC")
        .fetch_all(pool)
        .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("blog list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load blog posts. Try again.").await?;
            return Ok(());
        }
    };

    for blog in &blogs {
        let text = format!(
            "📰 {}\n{} · ❤️ {} · 🔗 {}\n\n{}",
            blog.title,
            fmt_date(blog.created_at.date_naive()),
            blog.likes,
            blog.shares,
            truncate_chars(&blog.content, 300)
        );
        let row = vec![
            InlineKeyboardButton::callback("✏️ Edit".to_string(), format!("a_bedit:{}", blog.id)),
            InlineKeyboardButton::callback("💬 Comments".to_string(), format!("a_bcomm:{}", blog.id)),
            InlineKeyboardButton::callback("🗑 Delete".to_string(), format!("a_bdel:{}", blog.id)),
        ];
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }

    let keyboard = InlineKeyboardMarkup::new(vec![vec![InlineKeyboardButton::callback(
        "➕ New post".to_string(),
        "a_badd".to_string(),
    )]]);
    let intro = if blogs.is_empty() { "No posts yet." } else { "Manage posts:" };
    bot.send_message(chat_id, intro).reply_markup(keyboard).await?;
    Ok(())
}

async fn show_blog_comments_admin(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    blog_id: i32,
) -> HandlerResult {
    let comments = match sqlx::query_as::<_, BlogComment>(
        "SELECT * FROM blog_comments WHERE blog_id = $1 ORDER BY created_at DESC",
    )
    .bind(blog_id)
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("comment list for blog {blog_id} failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load comments. Try again.").await?;
            return Ok(());
        }
    };

    if comments.is_empty() {
        bot.send_message(chat_id, "No comments on this post.").await?;
        return Ok(());
    }

    for comment in &comments {
        let text = format!("{} ({}):\n{}", comment.name, comment.status, comment.comment);
        let mut row = Vec::new();
        if comment.status == "pending" {
            row.push(InlineKeyboardButton::callback(
                "✅ Approve".to_string(),
                format!("a_okc:{}", comment.id),
            ));
        } else {
            row.push(InlineKeyboardButton::callback(
                "↩️ Unapprove".to_string(),
                format!("a_noc:{}", comment.id),
            ));
        }
        row.push(InlineKeyboardButton::callback(
            "🗑 Delete".to_string(),
            format!("a_delc:{}", comment.id),
        ));
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }
    Ok(())
}

async fn show_testimonials_admin(bot: &Bot, chat_id: ChatId, pool: &PgPool) -> HandlerResult {
    let testimonials = match sqlx::query_as::<_, Testimonial>(
        "SELECT * FROM testimonials ORDER BY created_at DESC",
    )
    .fetch_all(pool)
    .await
    {
        Ok(list) => list,
        Err(e) => {
            error!("testimonial list failed: {e}");
            bot.send_message(chat_id, "⚠️ Failed to load testimonials. Try again.").await?;
            return Ok(());
        }
    };

    if testimonials.is_empty() {
        bot.send_message(chat_id, "No testimonials submitted yet.").await?;
        return Ok(());
    }

    for t in &testimonials {
        let text = format!("{} ({}) — {}\n“{}”", t.name, t.category, t.status, t.message);
        let mut row = Vec::new();
        if t.status == "pending" {
            row.push(InlineKeyboardButton::callback(
                "✅ Approve".to_string(),
                format!("a_okt:{}", t.id),
            ));
        } else {
            row.push(InlineKeyboardButton::callback(
                "↩️ Unapprove".to_string(),
                format!("a_not:{}", t.id),
            ));
        }
        row.push(InlineKeyboardButton::callback(
            "🗑 Delete".to_string(),
            format!("a_delt:{}", t.id),
        ));
        bot.send_message(chat_id, text)
            .reply_markup(InlineKeyboardMarkup::new(vec![row]))
            .await?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Mutations & helpers
// ---------------------------------------------------------------------------

/// Creates the durable account and consumes the staging record in one
/// transaction. A failure before commit leaves the staging row in place,
/// so the action can simply be retried; a concurrent promotion surfaces
/// as `RowNotFound`.
async fn promote_client(pool: &PgPool, staged: &PendingClient) -> Result<i32, sqlx::Error> {
    let mut tx = pool.begin().await?;
    let user_id: i32 = sqlx::query_scalar(
        "INSERT INTO users (telegram_id, name, email, phone, role) \
         VALUES ($1, $2, $3, $4, 'client') RETURNING id",
    )
    .bind(staged.telegram_id)
    .bind(&staged.name)
    .bind(&staged.email)
    .bind(&staged.phone)
    .fetch_one(&mut *tx)
    .await?;
    let deleted = sqlx::query("DELETE FROM pending_clients WHERE id = $1")
        .bind(staged.id)
        .execute(&mut *tx)
        .await?;
    if deleted.rows_affected() == 0 {
        tx.rollback().await?;
        return Err(sqlx::Error::RowNotFound);
    }
    tx.commit().await?;
    Ok(user_id)
}

async fn moderate_comment(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    comment_id: i32,
    status: &str,
) -> HandlerResult {
    match sqlx::query("UPDATE blog_comments SET status = $1 WHERE id = $2")
        .bind(status)
        .bind(comment_id)
        .execute(pool)
        .await
    {
        Ok(_) => {
            bot.send_message(chat_id, format!("Comment marked {status}.")).await?;
        }
        Err(e) => {
            error!("moderation of comment {comment_id} failed: {e}");
            bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
        }
    }
    Ok(())
}

async fn moderate_testimonial(
    bot: &Bot,
    chat_id: ChatId,
    pool: &PgPool,
    test_id: i32,
    status: &str,
) -> HandlerResult {
    match sqlx::query("UPDATE testimonials SET status = $1, updated_at = NOW() WHERE id = $2")
        .bind(status)
        .bind(test_id)
        .execute(pool)
        .await
    {
        Ok(_) => {
            bot.send_message(chat_id, format!("Testimonial marked {status}.")).await?;
        }
        Err(e) => {
            error!("moderation of testimonial {test_id} failed: {e}");
            bot.send_message(chat_id, "⚠️ Action failed. Try again.").await?;
        }
    }
    Ok(())
}

async fn appointment_by_id(pool: &PgPool, appt_id: i32) -> Result<Option<Appointment>, sqlx::Error> {
    sqlx::query_as::<_, Appointment>("SELECT * FROM appointments WHERE id = $1")
        .bind(appt_id)
        .fetch_optional(pool)
        .await
}

fn render_contact(contact: &Contact, truncated: bool) -> String {
    let (message, _) = if truncated {
        truncate_words(&contact.message, 15)
    } else {
        (contact.message.clone(), false)
    };
    let email = contact.email.as_deref().unwrap_or("—");
    format!(
        "📨 {}\n{}\n{}\n\n{}",
        contact.name,
        email,
        contact.created_at.format("%d %b %Y, %H:%M"),
        message
    )
}

fn nav_row(prefix: &str, page: usize, total_pages: usize) -> Vec<InlineKeyboardButton> {
    let mut row = Vec::new();
    if page > 0 {
        row.push(InlineKeyboardButton::callback(
            "⬅️ Back".to_string(),
            format!("{prefix}:{}", page - 1),
        ));
    }
    row.push(InlineKeyboardButton::callback(
        format!("📄 {}/{}", page + 1, total_pages),
        "ignore".to_string(),
    ));
    if page + 1 < total_pages {
        row.push(InlineKeyboardButton::callback(
            "Next ➡️".to_string(),
            format!("{prefix}:{}", page + 1),
        ));
    }
    row
}

fn callback_id(data: &str) -> Option<i32> {
    data.split(':').nth(1)?.parse().ok()
}

fn callback_page(data: &str) -> Option<usize> {
    data.split(':').nth(1)?.parse().ok()
}

fn truncate_words(text: &str, limit: usize) -> (String, bool) {
    let words: Vec<&str> = text.split_whitespace().collect();
    if words.len() <= limit {
        (text.to_string(), false)
    } else {
        (format!("{}...", words[..limit].join(" ")), true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_messages_are_untouched() {
        let (out, truncated) = truncate_words("short message", 15);
        assert_eq!(out, "short message");
        assert!(!truncated);
    }

    #[test]
    fn long_messages_are_cut_at_the_word_limit() {
        let input = "one two three four five six seven eight nine ten eleven twelve \
                     thirteen fourteen fifteen sixteen seventeen";
        let (out, truncated) = truncate_words(input, 15);
        assert!(truncated);
        assert!(out.ends_with("..."));
        assert_eq!(out.split_whitespace().count(), 15);
        assert!(out.starts_with("one two three"));
    }

    #[test]
    fn nav_row_hides_unreachable_pages() {
        let first = nav_row("a_page", 0, 3);
        assert_eq!(first.len(), 2); // no "back" on the first page
        let middle = nav_row("a_page", 1, 3);
        assert_eq!(middle.len(), 3);
        let last = nav_row("a_page", 2, 3);
        assert_eq!(last.len(), 2); // no "next" on the last page
    }

    #[test]
    fn admin_labels_cover_the_console() {
        assert!(is_admin_label(BTN_ADMIN_APPTS));
        assert!(is_admin_label(BTN_ADMIN_CLIENTS));
        assert!(!is_admin_label("📅 Book appointment"));
        assert!(!is_admin_label(""));
    }

    #[test]
    fn admin_steps_are_disjoint_from_client_steps() {
        assert!(is_admin_step(UserStep::AdminSuggestDate));
        assert!(is_admin_step(UserStep::AdminBlogImage));
        assert!(!is_admin_step(UserStep::BookDate));
        assert!(!is_admin_step(UserStep::Idle));
    }
}
