//! KICKOFF - football news, fixtures and tables as chat cards

mod api;
mod community;
mod config;
mod consts;
mod delivery;
mod error;
mod football;
mod logic;
mod models;
mod network;
mod template;
mod utils;

use crate::config::Config;
use crate::logic::{Command, Section, Services};
use axum::Router;
use reqwest::Url;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use teloxide::dispatching::DefaultKey;
use teloxide::prelude::*;
use teloxide::RequestError;
use teloxide::update_listeners::webhooks;
use teloxide::utils::command::BotCommands;

/// Slash commands shown in the client menu. `/fixtures pl` and friends carry
/// their argument to the text router; the bare form opens the section menu.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
enum MenuCommand {
    #[command(description = "Show help message")]
    Start,
    #[command(description = "Show help message")]
    Help,
    #[command(description = "⚽ Headlines from every source")]
    AllNews,
    #[command(description = "📰 News from one source")]
    News(String),
    #[command(description = "📅 This matchday's fixtures")]
    Fixtures(String),
    #[command(description = "🏁 Latest results")]
    Results(String),
    #[command(description = "📊 League tables")]
    Standings(String),
    #[command(description = "👕 Clubs and squads")]
    Teams,
}

impl MenuCommand {
    /// Router token for this command.
    fn to_input(&self) -> String {
        let with_arg = |verb: &str, section: Section, arg: &str| match arg.trim() {
            "" => Command::Go(section).to_string(),
            arg => format!("{}={}", verb, arg),
        };
        match self {
            MenuCommand::Start | MenuCommand::Help => Command::Help.to_string(),
            MenuCommand::AllNews => Command::AllNews.to_string(),
            MenuCommand::News(arg) => with_arg("news", Section::News, arg),
            MenuCommand::Fixtures(arg) => with_arg("fixtures", Section::Fixtures, arg),
            MenuCommand::Results(arg) => with_arg("results", Section::Results, arg),
            MenuCommand::Standings(arg) => with_arg("standings", Section::Standings, arg),
            MenuCommand::Teams => Command::Go(Section::Teams).to_string(),
        }
    }
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let mut logger = pretty_env_logger::formatted_builder();
    logger.filter_level(log::LevelFilter::Info);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        logger.parse_filters(&filters);
    }
    logger.init();

    log::info!("═══════════════════════════════════════════");
    log::info!("  KICKOFF ONLINE. WARMING UP THE TOUCHLINE...");
    log::info!("═══════════════════════════════════════════");

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("configuration error: {}", e);
            std::process::exit(1);
        }
    };
    let webhook = config.webhook_url.clone().zip(config.channel_secret.clone());
    let bot = Bot::new(config.bot_token.clone());
    let services = match Services::new(config) {
        Ok(services) => services,
        Err(e) => {
            log::error!("failed to build http client: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = bot.set_my_commands(MenuCommand::bot_commands()).await {
        log::warn!("could not publish command menu: {}", e);
    }

    match webhook {
        Some((url, secret)) => run_webhook(bot, services, url, secret).await,
        None => run_polling(bot, services).await,
    }
}

fn build_dispatcher(bot: Bot, services: Arc<Services>) -> Dispatcher<Bot, RequestError, DefaultKey> {
    let handler = dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<MenuCommand>()
                .endpoint(handle_menu_command),
        )
        .branch(Update::filter_message().endpoint(handle_message))
        .branch(Update::filter_callback_query().endpoint(handle_callback));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![services])
        .enable_ctrlc_handler()
        .build()
}

async fn run_polling(bot: Bot, services: Arc<Services>) {
    log::info!("long polling for updates");
    let app = api::create_router(Arc::clone(&services));
    tokio::spawn(serve_http(services.config.http_addr, app, std::future::pending()));

    build_dispatcher(bot, services).dispatch().await;
}

/// Webhook intake and the JSON endpoints share one listener.
async fn run_webhook(bot: Bot, services: Arc<Services>, url: Url, secret: String) {
    let addr = services.config.http_addr;
    log::info!("registering webhook {}", url);

    let options = webhooks::Options::new(addr, url).secret_token(secret);
    let (listener, stop_flag, bot_router) = match webhooks::axum_to_router(bot.clone(), options).await {
        Ok(parts) => parts,
        Err(e) => {
            log::error!("failed to register webhook: {}", e);
            return;
        }
    };

    let app = bot_router.merge(api::create_router(Arc::clone(&services)));
    tokio::spawn(serve_http(addr, app, stop_flag));

    build_dispatcher(bot, services)
        .dispatch_with_listener(listener, LoggingErrorHandler::with_custom_text("webhook listener error"))
        .await;
}

async fn serve_http(addr: SocketAddr, app: Router, shutdown: impl Future<Output = ()> + Send + 'static) {
    let server = match axum::Server::try_bind(&addr) {
        Ok(server) => server,
        Err(e) => {
            log::error!("cannot bind {}: {}", addr, e);
            return;
        }
    };
    log::info!("http listening on {}", addr);

    if let Err(e) = server.serve(app.into_make_service()).with_graceful_shutdown(shutdown).await {
        log::error!("http server stopped: {}", e);
    }
}

async fn handle_menu_command(
    bot: Bot,
    msg: Message,
    cmd: MenuCommand,
    services: Arc<Services>,
) -> ResponseResult<()> {
    let reply = services.handle_text(&cmd.to_input()).await;
    delivery::deliver(&bot, msg.chat.id, reply).await
}

async fn handle_message(bot: Bot, msg: Message, services: Arc<Services>) -> ResponseResult<()> {
    let Some(text) = msg.text() else { return Ok(()) };
    let reply = services.handle_text(text).await;
    delivery::deliver(&bot, msg.chat.id, reply).await
}

/// Postbacks: acknowledge the tap, then route the payload like typed text.
async fn handle_callback(bot: Bot, q: CallbackQuery, services: Arc<Services>) -> ResponseResult<()> {
    bot.answer_callback_query(q.id.clone()).await?;

    let (Some(data), Some(message)) = (q.data.as_deref(), q.message.as_ref()) else {
        log::debug!("callback {} without data or message", q.id);
        return Ok(());
    };
    let reply = services.handle_text(data).await;
    delivery::deliver(&bot, message.chat.id, reply).await
}
