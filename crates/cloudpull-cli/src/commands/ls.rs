use cloudpull_app::DownloadSession;
use cloudpull_core::{ProfileSelection, RemoteEntry};
use tracing::warn;

use crate::cli::LsArgs;
use crate::client::{AppContext, CliResult};
use crate::output::render_entries;

pub(crate) async fn handle_ls(ctx: &AppContext, args: &LsArgs) -> CliResult<()> {
    let backend = ctx.connect().await?;
    let mut session = ctx.session(&backend);
    let result = list(&mut session, args).await;
    backend.shutdown().await;

    render_entries(&result?, ctx.output)
}

async fn list(session: &mut DownloadSession, args: &LsArgs) -> CliResult<Vec<RemoteEntry>> {
    if let Err(err) = session.refresh_profiles().await {
        warn!(error = %err, "could not refresh remotes");
    }
    if let Some(remote) = &args.remote {
        session.select_profile(ProfileSelection::Selected(remote.clone()))?;
    }
    if let Some(source) = &args.source {
        session.params_mut()?.set_source(source.clone());
    }
    Ok(session.list_files(&args.path).await?)
}
