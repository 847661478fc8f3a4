mod app_state;
mod commands;
mod config;
mod metadata;
mod sampler;
mod session;
mod storage;

use anyhow::Result;
use chrono::Local;
use log::info;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use crate::app_state::{App, AppEvent};
use crate::commands::AppCommand;
use crate::config::AppConfig;
use crate::session::CurationService;
use crate::storage::ObjectBlobStore;

fn init_logging(log_dir: &std::path::Path) -> Result<std::path::PathBuf> {
    let ts = Local::now().format("%Y%m%d-%H%M%S").to_string();
    std::fs::create_dir_all(log_dir)?;
    let log_path = log_dir.join(format!("app-{}.log", ts));
    let log_file = std::fs::File::create(&log_path)?;
    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(Box::new(log_file)))
        .filter_level(log::LevelFilter::Warn)
        .filter_module("layermeta", log::LevelFilter::Info)
        .filter_module("object_store", log::LevelFilter::Error)
        .init();
    Ok(log_path)
}

fn print_event(evt: AppEvent) {
    match evt {
        AppEvent::Message(msg) => println!("{}", msg),
        AppEvent::Warning(msg) => println!("{}", msg),
        AppEvent::Error(msg) => eprintln!("{}", msg),
        AppEvent::Lines(lines) => {
            for line in lines {
                println!("{}", line);
            }
        }
    }
}

fn prompt(app: &App) {
    match &app.session {
        Some(s) => print!("[{}]> ", s.dataset_id),
        None => print!("> "),
    }
    let _ = std::io::stdout().flush();
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    // .env 不存在时直接用系统环境变量
    let env_loaded = dotenv::dotenv().is_ok();
    let config = AppConfig::from_env()?;
    let log_path = init_logging(&config.log_dir)?;

    let store = ObjectBlobStore::from_location(&config.store_location)?;
    info!(
        "启动: store={}, sample_limit={}, .env={}",
        store, config.sample_limit, env_loaded
    );
    println!("存储位置: {}", store.url());
    println!("日志文件: {}", log_path.display());
    println!("输入 help 查看命令");

    let service = Arc::new(CurationService::new(Arc::new(store), config.sample_limit));
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel::<AppEvent>();
    let mut app = App::new(service, evt_tx);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt(&app);
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let cmd = line.parse::<AppCommand>().unwrap_or(AppCommand::Help);
        let keep_going = commands::handle(&mut app, cmd).await;
        while let Ok(evt) = evt_rx.try_recv() {
            print_event(evt);
        }
        if !keep_going {
            break;
        }
    }

    if let Some(s) = &app.session {
        info!("退出时丢弃未保存的会话: {}", s.dataset_id);
    }
    Ok(())
}
