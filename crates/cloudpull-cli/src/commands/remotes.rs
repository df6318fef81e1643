use tracing::warn;

use crate::client::{AppContext, CliResult};
use crate::commands::follow;
use crate::output::render_profiles;

pub(crate) async fn handle_remotes_list(ctx: &AppContext) -> CliResult<()> {
    let backend = ctx.connect().await?;
    let mut session = ctx.session(&backend);
    let result = session.refresh_profiles().await;
    backend.shutdown().await;

    let profiles = result?;
    render_profiles(&profiles, session.profiles().selected_id(), ctx.output)
}

pub(crate) async fn handle_remotes_create(ctx: &AppContext) -> CliResult<()> {
    let backend = ctx.connect().await?;
    let mut session = ctx.session(&backend);
    if let Err(err) = session.refresh_profiles().await {
        warn!(error = %err, "could not list existing remotes");
    }
    let mut stream = session.events().subscribe(None);
    let result = follow(session.create_profile(), &mut stream).await;
    backend.shutdown().await;

    result?;
    Ok(())
}
