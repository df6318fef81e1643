use std::future::Future;
use std::io::{self, Write};
use std::sync::Arc;

use anyhow::anyhow;
use cloudpull_app::{CancelOutcome, DownloadSession, SubmitOutcome};
use cloudpull_core::{BandwidthLimit, ProfileSelection, TransferMode, TransferRun, TransferStatus};
use cloudpull_events::EventStream;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::warn;

use super::follow;
use crate::cli::PullArgs;
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_prompt;

pub(crate) async fn handle_pull(ctx: &AppContext, args: &PullArgs) -> CliResult<()> {
    let backend = ctx.connect().await?;
    let mut session = ctx.session(&backend);
    let result = pull(&mut session, args).await;
    backend.shutdown().await;
    result
}

async fn pull(session: &mut DownloadSession, args: &PullArgs) -> CliResult<()> {
    if let Err(err) = session.refresh_profiles().await {
        warn!(error = %err, "could not refresh remotes");
    }
    apply_args(session, args)?;

    let mut stream = session.events().subscribe(None);
    let interrupted = Arc::new(Notify::new());
    let interrupts = watch_interrupts(session, Arc::clone(&interrupted));
    let result = until_interrupted(submit(session, args, &mut stream), &interrupted).await;
    interrupts.abort();
    result
}

/// Run `future` unless an interrupt arrives first.
async fn until_interrupted<T>(
    future: impl Future<Output = CliResult<T>>,
    interrupted: &Notify,
) -> CliResult<T> {
    tokio::select! {
        result = future => result,
        () = interrupted.notified() => {
            eprintln!("Interrupted.");
            Err(CliError::Interrupted)
        }
    }
}

async fn submit(
    session: &mut DownloadSession,
    args: &PullArgs,
    stream: &mut EventStream,
) -> CliResult<()> {
    let outcome = match follow(session.submit(), stream).await? {
        SubmitOutcome::ConfirmationRequired(prompt) => {
            render_prompt(&prompt);
            if !(args.yes || ask_confirmation().await?) {
                session.dismiss_confirmation();
                println!("Download cancelled.");
                return Ok(());
            }
            follow(session.confirm(), stream).await?
        }
        outcome => outcome,
    };

    match outcome {
        SubmitOutcome::Finished(run) if run.status == TransferStatus::Completed => Ok(()),
        SubmitOutcome::Finished(run) => Err(CliError::failure(anyhow!(failure_reason(&run)))),
        SubmitOutcome::Invalid(reason) => Err(CliError::validation(reason.to_string())),
        SubmitOutcome::ConfirmationRequired(_) => Err(CliError::failure(anyhow!(
            "download is still waiting for confirmation"
        ))),
    }
}

fn apply_args(session: &mut DownloadSession, args: &PullArgs) -> CliResult<()> {
    if let Some(remote) = &args.remote {
        session.select_profile(ProfileSelection::Selected(remote.clone()))?;
    }
    let params = session.params_mut()?;
    if let Some(source) = &args.source {
        params.set_source(source.clone());
    }
    if let Some(destination) = &args.destination {
        params.set_destination(destination.clone());
    }
    if args.no_backup {
        params.set_create_backup(false);
    }
    if args.no_subfolder {
        params.set_create_subfolder(false);
    }
    if args.copy {
        params.set_mode(TransferMode::Copy);
    }
    if args.delete_excluded {
        params.set_delete_excluded(true);
    }
    if args.track_renames {
        params.set_track_renames(true);
    }
    if let Some(raw) = &args.bwlimit {
        let limit = BandwidthLimit::parse(raw).ok_or_else(|| {
            CliError::validation(format!(
                "invalid bandwidth limit '{raw}' (expected e.g. 10M or 512K)"
            ))
        })?;
        params.set_bandwidth_limit(Some(limit));
    }
    if !args.select.is_empty() {
        params.set_selection(Some(args.select.clone()));
    }
    Ok(())
}

/// Route Ctrl-C to the running transfer; wake `interrupted` when nothing runs.
fn watch_interrupts(session: &DownloadSession, interrupted: Arc<Notify>) -> JoinHandle<()> {
    let orchestrator = session.cancel_handle();
    tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            match orchestrator.cancel().await {
                CancelOutcome::NotRunning => {
                    interrupted.notify_one();
                    return;
                }
                CancelOutcome::AlreadyCancelling => {
                    eprintln!("Cancellation already requested, waiting for rclone to stop.");
                }
                CancelOutcome::Requested | CancelOutcome::StopFailed(_) => {}
            }
        }
    })
}

async fn ask_confirmation() -> CliResult<bool> {
    let answer = tokio::task::spawn_blocking(|| -> io::Result<String> {
        print!("Proceed? [y/N] ");
        io::stdout().flush()?;
        let mut answer = String::new();
        io::stdin().read_line(&mut answer)?;
        Ok(answer)
    })
    .await
    .map_err(|err| CliError::failure(anyhow!("confirmation prompt aborted: {err}")))?
    .map_err(|err| CliError::failure(anyhow!("failed to read confirmation: {err}")))?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn failure_reason(run: &TransferRun) -> String {
    run.log_lines
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix("Error: "))
        .map_or_else(|| run.status_message.clone(), str::to_string)
}
