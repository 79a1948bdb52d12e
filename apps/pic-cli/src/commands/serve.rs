// serve.rs — `pic serve`: run the loopback HTTP bridge.
//
// Runs on a current-thread runtime, so one bridge instance evaluates one
// request at a time. Ctrl-C shuts down gracefully. On unix, SIGHUP reloads
// the policy and keyring from their sources; a reload that fails to load
// keeps the previous pipeline.

use std::sync::Arc;

use anyhow::Context;
use pic_bridge::{bind, serve, BridgeState};

use super::Bootstrap;

pub fn execute(boot: &Bootstrap) -> anyhow::Result<()> {
    let base_dir = boot.project_root.clone();
    let pipeline = boot.pipeline(&base_dir)?;
    let config = boot.config.bridge.clone();

    tracing::info!(
        policy = %boot.policy_source(),
        keyring = %boot.keyring_source(),
        verify_evidence = pipeline.options().verify_evidence,
        "starting PIC bridge"
    );

    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    rt.block_on(async {
        let listener = bind(&config).await?;
        let state = Arc::new(BridgeState::new(pipeline, config));

        #[cfg(unix)]
        spawn_reload_on_hangup(boot, Arc::clone(&state))?;

        serve(listener, state, async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;
        Ok::<(), anyhow::Error>(())
    })
}

#[cfg(unix)]
fn spawn_reload_on_hangup(boot: &Bootstrap, state: Arc<BridgeState>) -> anyhow::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = signal(SignalKind::hangup()).context("failed to install SIGHUP handler")?;
    let reload = Bootstrap::new(boot.project_root.clone(), boot.config.clone());
    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            match reload.pipeline(&reload.project_root) {
                Ok(pipeline) => state.replace_pipeline(pipeline),
                Err(e) => tracing::error!(
                    error = %format!("{:#}", e),
                    "reload failed; keeping previous pipeline"
                ),
            }
        }
    });
    Ok(())
}
