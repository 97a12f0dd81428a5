//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppState;
use crate::errors::ProvisionerError;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::workers::pool;

/// Run the ICAP provisioning service
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), ProvisionerError> {
    info!("Initializing ICAP service...");

    // Create shutdown channel
    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

    if let Err(e) = init(&options, shutdown_tx.clone(), &mut shutdown_manager).await {
        error!("Failed to start service: {}", e);
        shutdown_manager.shutdown().await?;
        return Err(e);
    }

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    drop(shutdown_tx);
    shutdown_manager.shutdown().await
}

// =============================== INITIALIZATION ================================== //

async fn init(
    options: &AppOptions,
    shutdown_tx: broadcast::Sender<()>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), ProvisionerError> {
    let app_state = AppState::init(options)?;

    init_workers(options, &app_state, shutdown_manager, &shutdown_tx)?;
    init_server(options, &app_state, shutdown_manager, shutdown_tx.subscribe()).await?;

    Ok(())
}

fn init_workers(
    options: &AppOptions,
    app_state: &AppState,
    shutdown_manager: &mut ShutdownManager,
    shutdown_tx: &broadcast::Sender<()>,
) -> Result<(), ProvisionerError> {
    let count = options.workers.count.max(1);
    info!("Initializing {} task workers...", count);

    let mut handles = Vec::with_capacity(count);
    for worker_id in 0..count {
        let receiver = app_state.receiver.clone();
        let runner = app_state.runner.clone();
        let results = app_state.results.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();

        handles.push(tokio::spawn(async move {
            pool::run(
                worker_id,
                receiver,
                runner,
                results,
                Box::pin(async move {
                    let _ = shutdown_rx.recv().await;
                }),
            )
            .await;
        }));
    }

    shutdown_manager.with_worker_handles(handles)
}

async fn init_server(
    options: &AppOptions,
    app_state: &AppState,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), ProvisionerError> {
    info!("Initializing HTTP server...");

    let server_state = ServerState::new(
        app_state.dispatcher.clone(),
        app_state.results.clone(),
        options.vlab_url.clone(),
        options.token,
    );

    let server_handle = serve(&options.server, Arc::new(server_state), async move {
        let _ = shutdown_rx.recv().await;
    })
    .await?;

    shutdown_manager.with_server_handle(server_handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    server_handle: Option<JoinHandle<Result<(), ProvisionerError>>>,
    worker_handles: Option<Vec<JoinHandle<()>>>,
}

impl ShutdownManager {
    pub fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            server_handle: None,
            worker_handles: None,
        }
    }

    pub fn with_worker_handles(&mut self, handles: Vec<JoinHandle<()>>) -> Result<(), ProvisionerError> {
        if self.worker_handles.is_some() {
            return Err(ProvisionerError::ShutdownError("worker_handles already set".to_string()));
        }
        self.worker_handles = Some(handles);
        Ok(())
    }

    pub fn with_server_handle(
        &mut self,
        handle: JoinHandle<Result<(), ProvisionerError>>,
    ) -> Result<(), ProvisionerError> {
        if self.server_handle.is_some() {
            return Err(ProvisionerError::ShutdownError("server_handle already set".to_string()));
        }
        self.server_handle = Some(handle);
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), ProvisionerError> {
        let _ = self.shutdown_tx.send(());

        match tokio::time::timeout(
            self.lifecycle_options.max_shutdown_delay,
            self.shutdown_impl(),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => {
                error!(
                    "Shutdown timed out after {:?}, forcing shutdown...",
                    self.lifecycle_options.max_shutdown_delay
                );
                std::process::exit(1);
            }
        }
    }

    async fn shutdown_impl(&mut self) -> Result<(), ProvisionerError> {
        info!("Shutting down ICAP service...");

        // 1. Server, so no new tasks arrive
        if let Some(handle) = self.server_handle.take() {
            handle
                .await
                .map_err(|e| ProvisionerError::ShutdownError(e.to_string()))??;
        }

        // 2. Workers, each finishing its in-flight task
        if let Some(handles) = self.worker_handles.take() {
            for handle in handles {
                handle
                    .await
                    .map_err(|e| ProvisionerError::ShutdownError(e.to_string()))?;
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}
