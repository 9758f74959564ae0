use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use rt_bot::autoban::AutoBan;
use rt_bot::bot::banhammer::Banhammer;
use rt_bot::bot::broadcast::BroadcastStatus;
use rt_bot::bot::openai::OpenAi;
use rt_bot::bot::sys::Sys;
use rt_bot::bot::wtf::Wtf;
use rt_bot::bot::{Bot, MultiBot};
use rt_bot::chat::{ChatApi, SuperUsers};
use rt_bot::config::{flipbook, timeout};
use rt_bot::events::telegram::{self, TelegramApi};
use rt_bot::events::{Flipbook, Listener, ListenerParams, ListenerParts};
use rt_bot::llm::{LlmClient, LlmParams};
use rt_bot::opts::Opts;
use rt_bot::reporter::{Reporter, ReporterParams};
use rt_bot::rtjc::{Rtjc, RtjcParams, Submitter};
use rt_bot::spam::local::load_lines;
use rt_bot::spam::{CasOracle, LlmOracle, LocalOracle, SpamFilter};
use rt_bot::terminator::Terminator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[tokio::main]
async fn main() {
    dotenv().ok();

    let opts = match Opts::try_parse() {
        Ok(opts) => opts,
        Err(e) => {
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            std::process::exit(code);
        }
    };

    let level = if opts.dbg { log::LevelFilter::Debug } else { log::LevelFilter::Info };
    pretty_env_logger::formatted_timed_builder()
        .filter_level(level)
        .parse_default_env()
        .init();

    log::info!("starting rt-bot {}", env!("CARGO_PKG_VERSION"));
    if let Err(e) = run(opts).await {
        log::error!("{:#}", e);
        std::process::exit(2);
    }
}

async fn run(opts: Opts) -> Result<()> {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let shutdown_tx = Arc::new(shutdown_tx);
    let mut tasks: Vec<JoinHandle<()>> = Vec::new();

    let tg = teloxide::Bot::new(&opts.token);
    let (bot_username, bot_display_name) = if opts.bot_name.is_empty() {
        telegram::identity(&tg).await?
    } else {
        (opts.bot_name.clone(), String::new())
    };
    log::info!("bot name {}", bot_username);

    let api: Arc<dyn ChatApi> = Arc::new(TelegramApi::new(tg.clone()));
    let super_users = opts.super_users();
    log::info!("{} super-users", super_users.len());

    let reporter = if opts.log_dir.as_os_str().is_empty() {
        None
    } else {
        let params = ReporterParams {
            message_url: opts.message_url.clone(),
            check_delay: Duration::from_secs(opts.message_check_delay_secs),
            ..ReporterParams::new(&opts.log_dir)
        };
        let (reporter, handle) = Reporter::start(params, shutdown_rx.clone())?;
        tasks.push(handle);
        Some(reporter)
    };

    let mut bots = MultiBot::new(Vec::new());
    match Sys::load(&opts.sys_data) {
        Ok(sys) => bots.push(Arc::new(sys)),
        Err(e) => log::warn!("sys bot disabled: {:#}", e),
    }
    let (wtf_min, wtf_max) = opts.wtf_range();
    bots.push(Arc::new(Wtf::new(wtf_min, wtf_max)));
    bots.push(Arc::new(Banhammer::new(Arc::clone(&api), super_users.clone())));
    if let Some(params) = opts.llm() {
        let client = LlmClient::new(params).context("can't make openai client")?;
        bots.push(Arc::new(OpenAi::new(client, opts.openai())));
    }
    if let Some(params) = opts.broadcast() {
        let (status, handle) = BroadcastStatus::start(params, shutdown_rx.clone())?;
        tasks.push(handle);
        bots.push(Arc::new(status));
    }
    log::info!("{} bots activated", bots.len());

    let listener = Arc::new(Listener::new(
        ListenerParams {
            chat_id: opts.group,
            bot_username,
            bot_display_name,
        },
        ListenerParts {
            api: Arc::clone(&api),
            bots,
            spam_filters: spam_filters(&opts, &super_users)?,
            terminator: Terminator::new(opts.terminator()),
            autoban: AutoBan::new(opts.autoban(), super_users.clone(), Arc::clone(&api)),
            reporter,
            flipbook: Flipbook::new(flipbook::MAX_ENTRIES, Duration::from_secs(opts.flipbook_ttl_secs)),
        },
    ));

    if let Some(addr) = opts.rtjc_addr() {
        let params = RtjcParams {
            addr,
            pin_marker: opts.pin_marker.clone(),
            pin_replacement: opts.pin_replacement.clone(),
        };
        let submitter: Arc<dyn Submitter> = listener.clone();
        let rtjc = Rtjc::bind(params, submitter).await?;
        tasks.push(tokio::spawn(rtjc.run(shutdown_rx.clone())));
    }

    let signal_tx = Arc::clone(&shutdown_tx);
    let max_lifetime = opts.max_lifetime();
    tokio::spawn(async move {
        let lifetime = async {
            match max_lifetime {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending::<()>().await,
            }
        };
        tokio::select! {
            res = tokio::signal::ctrl_c() => {
                if let Err(e) = res {
                    log::warn!("can't listen for ctrl-c: {}", e);
                    return;
                }
                log::info!("interrupted, shutting down");
            }
            _ = lifetime => log::info!("max lifetime reached, shutting down"),
        }
        let _ = signal_tx.send(true);
    });

    telegram::run(tg, listener, shutdown_rx).await;

    let _ = shutdown_tx.send(true);
    for handle in tasks {
        if let Err(e) = handle.await {
            log::warn!("background task failed: {}", e);
        }
    }
    log::info!("terminated");
    Ok(())
}

/// Admission filters in the order they are consulted: CAS, local similarity, llm.
fn spam_filters(opts: &Opts, super_users: &SuperUsers) -> Result<Vec<Arc<dyn Bot>>> {
    let mut filters: Vec<Arc<dyn Bot>> = Vec::new();

    if !opts.cas_api.is_empty() {
        let cas = CasOracle::new(opts.cas_api.clone()).context("can't make CAS client")?;
        filters.push(Arc::new(SpamFilter::new(Box::new(cas), super_users.clone(), opts.spam_dry)));
    }

    let samples = match &opts.spam_samples {
        Some(path) => load_lines(path)?,
        None => Vec::new(),
    };
    let stop_words = match &opts.spam_stop_words {
        Some(path) => load_lines(path)?,
        None => Vec::new(),
    };
    if !samples.is_empty() || !stop_words.is_empty() {
        log::info!("local spam filter with {} samples, {} stop phrases", samples.len(), stop_words.len());
        let local = LocalOracle::new(&samples, &stop_words, opts.local_oracle());
        filters.push(Arc::new(SpamFilter::new(Box::new(local), super_users.clone(), opts.spam_dry)));
    }

    if opts.spam_llm {
        match opts.llm() {
            Some(params) => {
                let params = LlmParams { timeout: timeout::ORACLE, ..params };
                let client = LlmClient::new(params).context("can't make llm client")?;
                let oracle = LlmOracle::new(client, &samples, opts.spam_prompt_size);
                filters.push(Arc::new(SpamFilter::new(Box::new(oracle), super_users.clone(), opts.spam_dry)));
            }
            None => log::warn!("llm spam filter requested without openai token, skipped"),
        }
    }

    log::info!("{} spam filters activated", filters.len());
    Ok(filters)
}
