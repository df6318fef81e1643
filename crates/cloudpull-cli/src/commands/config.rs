use cloudpull_app::AppError;
use cloudpull_config::{ConfigError, apply_setting};

use crate::cli::{ConfigSetArgs, OutputFormat};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::render_config;

pub(crate) fn handle_config_show(ctx: &AppContext) -> CliResult<()> {
    if ctx.output == OutputFormat::Table {
        println!("# {}", ctx.store.path().display());
    }
    render_config(ctx.store.config(), ctx.output)
}

pub(crate) async fn handle_config_set(ctx: &mut AppContext, args: &ConfigSetArgs) -> CliResult<()> {
    let next = apply_setting(ctx.store.config(), &args.key, &args.value).map_err(config_error)?;
    ctx.store.replace(next).await.map_err(config_error)?;
    println!("{} = {}", args.key, args.value.trim());
    Ok(())
}

fn config_error(err: ConfigError) -> CliError {
    match err {
        ConfigError::InvalidField { .. } | ConfigError::UnknownField { .. } => {
            CliError::validation(err.detail())
        }
        other => CliError::failure(AppError::config("config.set", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudpull_config::ConfigStore;

    async fn context() -> (tempfile::TempDir, AppContext) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = ConfigStore::open(dir.path().join("app-config.json"))
            .await
            .expect("open");
        (
            dir,
            AppContext {
                store,
                output: OutputFormat::Table,
            },
        )
    }

    fn set(key: &str, value: &str) -> ConfigSetArgs {
        ConfigSetArgs {
            key: key.into(),
            value: value.into(),
        }
    }

    #[tokio::test]
    async fn set_persists_value() {
        let (dir, mut ctx) = context().await;
        handle_config_set(&mut ctx, &set("download.bandwidth_limit", "5M"))
            .await
            .expect("set");
        handle_config_show(&ctx).expect("show");

        let reopened = ConfigStore::open(dir.path().join("app-config.json"))
            .await
            .expect("reopen");
        assert_eq!(
            reopened.config().download.bandwidth_limit.as_deref(),
            Some("5M")
        );
    }

    #[tokio::test]
    async fn unknown_key_is_a_validation_error() {
        let (_dir, mut ctx) = context().await;
        let err = handle_config_set(&mut ctx, &set("network.nope", "1"))
            .await
            .expect_err("unknown");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(
            err.display_message(),
            "unknown configuration field: network.nope"
        );
    }

    #[tokio::test]
    async fn invalid_value_is_rejected_and_not_saved() {
        let (_dir, mut ctx) = context().await;
        let err = handle_config_set(&mut ctx, &set("network.rc_addr", "localhost"))
            .await
            .expect_err("invalid");
        assert_eq!(err.exit_code(), 2);
        assert_eq!(ctx.store.config().network.rc_addr, "127.0.0.1:5572");
    }
}
