// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `xport`: one-shot or scheduled Trakt export runs (spec §6).

mod args;
mod config;
mod exit;
mod factory;
mod wiring;

use std::sync::Arc;

use xport_core::XportError;
use xport_scheduler::ExportRequest;
use xport_telemetry::LogFormat;

use crate::args::{Args, RunMode};
use crate::config::Config;
use crate::exit::{code_for, EXIT_INTERRUPTED, EXIT_SUCCESS};
use crate::factory::NullJobFactory;

#[tokio::main]
async fn main() {
    let code = run().await;
    std::process::exit(code);
}

async fn run() -> i32 {
    let args = match args::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => return fail(&e),
    };

    let config = match Config::load(args.config_path.as_deref()) {
        Ok(config) => config,
        Err(e) => return fail(&e),
    };

    init_logging(&config);

    let app = match wiring::build(config, Arc::new(NullJobFactory)).await {
        Ok(app) => app,
        Err(e) => return fail(&e),
    };

    let server_handle = if app.config.monitoring.enabled {
        let router = wiring::http_router(&app);
        let addr: std::net::SocketAddr = ([0, 0, 0, 0], app.config.monitoring.metrics_port).into();
        Some(tokio::spawn(async move {
            if let Ok(listener) = tokio::net::TcpListener::bind(addr).await {
                let _ = axum::serve(listener, router).await;
            }
        }))
    } else {
        None
    };

    let request = ExportRequest::new(args.scope, args.export_mode);

    let code = match args.mode {
        RunMode::Run => run_once(&app, request).await,
        RunMode::Schedule => run_scheduled(&app, &args, request).await,
    };

    if let Some(handle) = server_handle {
        handle.abort();
    }
    app.shutdown().await;
    code
}

async fn run_once(app: &wiring::App, request: ExportRequest) -> i32 {
    match app.scheduler.run_once(request).await {
        Ok(report) => {
            tracing::info!(
                submitted = report.submitted,
                processed = report.processed,
                failed = report.failed,
                "export run complete"
            );
            EXIT_SUCCESS
        }
        Err(e) => fail(&e),
    }
}

async fn run_scheduled(app: &wiring::App, args: &Args, request: ExportRequest) -> i32 {
    let Some(cron_expr) = args.cron.as_deref() else {
        return fail(&XportError::new(xport_core::ErrorKind::InvalidInput, "--schedule requires a cron expression"));
    };

    let scheduled = match app.scheduler.run_scheduled(cron_expr, request).await {
        Ok(scheduled) => scheduled,
        Err(e) => return fail(&e),
    };

    wait_for_signal().await;
    tracing::info!("received termination signal, shutting down");
    app.scheduler.stop().await;
    scheduled.join().await;
    EXIT_INTERRUPTED
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_logging(config: &Config) {
    let format = if config.logging.format == "structured" { LogFormat::Structured } else { LogFormat::Visual };
    let filter = tracing_subscriber::EnvFilter::try_new(&config.logging.level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match format {
        LogFormat::Structured => {
            let _ = subscriber.json().try_init();
        }
        LogFormat::Visual => {
            let _ = subscriber.try_init();
        }
    }
}

fn fail(error: &XportError) -> i32 {
    eprintln!("xport: {error}");
    tracing::error!(kind = %error.kind(), "fatal error");
    code_for(error.kind())
}
