use crate::Cli;
use crate::Command;
use agentloop_supervisor::Config;
use agentloop_supervisor::ConnectRequest;
use agentloop_supervisor::PauseAction;
use agentloop_supervisor::Supervisor;
use anyhow::bail;
use anyhow::Context;

/// Runs one CLI invocation to completion and returns the process exit
/// code: 0 on success, 1 on user error or a failure surfaced by the
/// façade (spec.md §6's CLI surface).
pub async fn run(cli: Cli) -> anyhow::Result<i32> {
    let config = Config::from_env().context("loading configuration")?;

    match cli.command {
        Some(Command::Serve) => serve(config).await,
        Some(Command::SetModel { kind }) => {
            let supervisor = Supervisor::init(config).await?;
            let switched = supervisor.facade.switch_model(kind).await;
            print_json(&serde_json::json!({ "ok": switched }));
            Ok(if switched { 0 } else { 1 })
        }
        Some(Command::RestartWorker { worker_id }) => {
            let supervisor = Supervisor::init(config).await?;
            match supervisor.facade.restart_worker(&worker_id).await {
                Ok(()) => {
                    print_json(&serde_json::json!({ "ok": true }));
                    Ok(0)
                }
                Err(err) => fail(&err),
            }
        }
        None => one_shot(cli, config).await,
    }
}

/// Runs the long-lived supervisor loop and its HTTP control plane
/// together, stopping both on the same shutdown signal.
async fn serve(config: Config) -> anyhow::Result<i32> {
    let host = config.http_host.clone();
    let port = config.http_port;
    let supervisor = Supervisor::init(config).await?;
    let facade = supervisor.facade.clone();
    let cancel = supervisor.shutdown_handle();

    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("binding HTTP control plane on {host}:{port}"))?;
    tracing::info!(%host, port, "HTTP control plane listening");
    let app = agentloop_api::router(facade);

    let server = axum::serve(listener, app).with_graceful_shutdown(async move {
        cancel.cancelled().await;
    });
    let server_task = tokio::spawn(server);

    // Wait for the supervisor's own shutdown sequence (worker drain,
    // snapshot save) to finish in full before joining the HTTP server,
    // which shares the same cancellation token and should already be
    // winding down by the time `run` returns.
    supervisor.run().await?;
    server_task
        .await
        .context("HTTP control plane task panicked")?
        .context("HTTP control plane")?;
    Ok(0)
}

/// Every non-`serve` invocation: one façade call, then exit. Checked in
/// the same order spec.md §6 lists the flags.
async fn one_shot(cli: Cli, config: Config) -> anyhow::Result<i32> {
    let supervisor = Supervisor::init(config).await?;
    let facade = &supervisor.facade;

    if cli.status {
        let status = facade.status().await?;
        print_json(&status);
        return Ok(0);
    }
    if cli.pause {
        let is_paused = facade.pause(PauseAction::Pause);
        print_json(&serde_json::json!({ "is_paused": is_paused }));
        return Ok(0);
    }
    if cli.resume {
        let is_paused = facade.pause(PauseAction::Resume);
        print_json(&serde_json::json!({ "is_paused": is_paused }));
        return Ok(0);
    }
    if let Some(limit) = cli.logs {
        match facade.logs(limit).await {
            Ok(events) => {
                print_json(&events);
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(path) = cli.load_tasks {
        match agentloop_supervisor::load_task_file_once(&path, &supervisor.queue_handle(), facade.default_max_retries())
            .await
        {
            Ok(count) => {
                print_json(&serde_json::json!({ "ok": true, "enqueued": count }));
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(parts) = cli.connect_repo {
        let [kind, location, alias] = <[String; 3]>::try_from(parts)
            .map_err(|_| anyhow::anyhow!("--connect-repo expects TYPE URL|PATH ALIAS"))?;
        let remote = match kind.as_str() {
            "remote" => true,
            "local" => false,
            other => bail!("--connect-repo TYPE must be \"remote\" or \"local\", got {other:?}"),
        };
        match facade
            .connect_repository(ConnectRequest {
                remote,
                location,
                alias: Some(alias),
                branch: None,
                initialize_git: false,
            })
            .await
        {
            Ok(binding) => {
                print_json(&binding);
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if cli.list_repos {
        print_json(&facade.list_repositories().await);
        return Ok(0);
    }
    if let Some(alias) = cli.scan_repo {
        match facade.scan_repository(&alias).await {
            Ok(result) => {
                print_json(&result);
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(alias) = cli.pull_repo {
        match facade.pull_repository(&alias).await {
            Ok(outcome) => {
                print_json(&outcome);
                return Ok(if outcome.ok { 0 } else { 1 });
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(alias) = cli.push_repo {
        match facade.push_repository(&alias).await {
            Ok(outcome) => {
                print_json(&outcome);
                return Ok(if outcome.ok { 0 } else { 1 });
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(alias) = cli.disconnect_repo {
        match facade.disconnect_repository(&alias).await {
            Ok(()) => {
                print_json(&serde_json::json!({ "ok": true }));
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if cli.tireless_reviewer_status {
        print_json(&facade.reviewer_status().await);
        return Ok(0);
    }
    if let Some(task_id) = cli.force_review {
        match facade.force_review(&task_id).await {
            Ok(findings) => {
                print_json(&findings);
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }
    if let Some(task_id) = cli.review_results {
        match facade.review_results(&task_id).await {
            Ok(findings) => {
                print_json(&findings);
                return Ok(0);
            }
            Err(err) => return fail(&err),
        }
    }

    let Some(description) = cli.description else {
        eprintln!("nothing to do: pass a task description, a flag, or `serve`");
        return Ok(1);
    };
    match facade.enqueue_task(description, cli.priority, cli.repo).await {
        Ok(task_id) => {
            print_json(&serde_json::json!({ "ok": true, "task_id": task_id }));
            Ok(0)
        }
        Err(err) => fail(&err),
    }
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{text}"),
        Err(err) => eprintln!("failed to serialize output: {err}"),
    }
}

fn fail(err: &dyn std::fmt::Display) -> anyhow::Result<i32> {
    eprintln!("error: {err}");
    Ok(1)
}
