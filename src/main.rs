use std::{collections::HashMap, sync::Arc};

use db::get_db_pool;
use handlers::{handle_callback_query, handle_message, UserSession};
use tokio::sync::Mutex;
mod admin;
mod db;
mod handlers;
mod models;
mod phone;
use teloxide::{
    dispatching::UpdateFilterExt,
    prelude::*,
    types::{CallbackQuery, MaybeInaccessibleMessage},
};

extern crate pretty_env_logger;
#[macro_use]
extern crate log;

#[tokio::main]
async fn main() {
    pretty_env_logger::init();
    let pool = get_db_pool().await;
    let bot = Bot::from_env();

    let user_sessions = Arc::new(Mutex::new(HashMap::<i64, UserSession>::new()));

    let handler = dptree::entry()
        .branch(Update::filter_message().endpoint({
            let pool = pool.clone();
            let user_sessions = user_sessions.clone();

            move |msg: Message, bot: Bot| {
                let pool = pool.clone();
                let user_sessions = user_sessions.clone();

                async move {
                    let mut sessions = user_sessions.lock().await;
                    if let Err(e) = handle_message(msg, bot, pool, &mut sessions).await {
                        error!("message handler failed: {e}");
                    }
                    respond(())
                }
            }
        }))
        .branch(Update::filter_callback_query().endpoint({
            let pool = pool.clone();
            let user_sessions = user_sessions.clone();

            move |q: CallbackQuery, bot: Bot| {
                let pool = pool.clone();
                let user_sessions = user_sessions.clone();

                async move {
                    let mut sessions = user_sessions.lock().await;
                    let message = q
                        .message
                        .clone()
                        .and_then(|m| MaybeInaccessibleMessage::regular_message(&m).cloned());
                    if let Some(message) = message {
                        if let Err(e) =
                            handle_callback_query(q, bot, message, pool, &mut sessions).await
                        {
                            error!("callback handler failed: {e}");
                        }
                    }
                    respond(())
                }
            }
        }));

    info!("Starting PhysioCare assistant bot");
    Dispatcher::builder(bot, handler)
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}
