use crate::core::{ExportBackend, Storage};
use crate::domain::model::{Destination, ExportReceipt, ExportTask, OperationState, RunReport};
use crate::utils::error::{ExportError, Result};
use crate::utils::monitor::RunMonitor;
use std::time::Duration;

pub const MANIFEST_FILE: &str = "export_manifest.json";

#[derive(Debug, Clone)]
pub struct WaitOptions {
    pub poll_interval: Duration,
    pub max_polls: u32,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            max_polls: 240,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_stamp: String,
    pub project: String,
    pub destination: Destination,
    /// `None` submits and returns without checking task completion.
    pub wait: Option<WaitOptions>,
}

pub struct ExportEngine<B: ExportBackend, S: Storage> {
    backend: B,
    storage: S,
    monitor: RunMonitor,
}

impl<B: ExportBackend, S: Storage> ExportEngine<B, S> {
    pub fn new(backend: B, storage: S) -> Self {
        Self::new_with_monitoring(backend, storage, false)
    }

    pub fn new_with_monitoring(backend: B, storage: S, monitor_enabled: bool) -> Self {
        Self {
            backend,
            storage,
            monitor: RunMonitor::new(monitor_enabled),
        }
    }

    /// Submits every task in order. A failed submission is recorded and the
    /// loop moves on to the next year.
    pub async fn submit_all(&self, tasks: &[ExportTask]) -> Vec<ExportReceipt> {
        let mut receipts = Vec::with_capacity(tasks.len());

        for task in tasks {
            let mut receipt = ExportReceipt {
                year: task.year,
                description: task.description.clone(),
                request_id: task.request.request_id.clone(),
                operation: None,
                state: None,
                error: None,
            };

            match self.backend.submit_table_export(task).await {
                Ok(operation) => {
                    tracing::info!("📤 {} submitted as {}", task.description, operation.name);
                    receipt.state = Some(operation.state());
                    receipt.operation = Some(operation.name);
                }
                Err(e) => {
                    tracing::error!("❌ {} could not be submitted: {}", task.description, e);
                    tracing::error!("💡 {}", e.recovery_suggestion());
                    receipt.error = Some(e.to_string());
                }
            }

            self.monitor.log_checkpoint(&task.description);
            receipts.push(receipt);
        }

        receipts
    }

    /// Polls each submitted operation until it reaches a terminal state.
    pub async fn wait_for_completion(&self, receipts: &mut [ExportReceipt], options: &WaitOptions) {
        for receipt in receipts.iter_mut() {
            let Some(name) = receipt.operation.clone() else {
                continue;
            };
            if receipt.state.map(|s| s.is_terminal()).unwrap_or(false) {
                continue;
            }

            match self.poll_until_done(&name, options).await {
                Ok((state, error)) => {
                    match state {
                        OperationState::Succeeded => {
                            tracing::info!("✅ {} finished", receipt.description)
                        }
                        other => tracing::warn!("⚠️ {} ended as {:?}", receipt.description, other),
                    }
                    receipt.state = Some(state);
                    if error.is_some() {
                        receipt.error = error;
                    }
                }
                Err(e) => {
                    tracing::warn!("⚠️ Lost track of {}: {}", receipt.description, e);
                    receipt.error = Some(e.to_string());
                }
            }
        }
    }

    async fn poll_until_done(
        &self,
        name: &str,
        options: &WaitOptions,
    ) -> Result<(OperationState, Option<String>)> {
        for attempt in 1..=options.max_polls {
            let operation = self.backend.get_operation(name).await?;
            let state = operation.state();
            tracing::debug!("{} poll {}: {:?}", name, attempt, state);

            if state.is_terminal() || operation.done {
                let error = operation.error.map(|e| format!("{} (code {})", e.message, e.code));
                return Ok((state, error));
            }

            if attempt < options.max_polls {
                tokio::time::sleep(options.poll_interval).await;
            }
        }

        Err(ExportError::PollTimeout {
            operation: name.to_string(),
            polls: options.max_polls,
        })
    }

    pub async fn run(&self, tasks: &[ExportTask], context: &RunContext) -> Result<RunReport> {
        tracing::info!(
            "🚀 Submitting {} table exports to project {} ({})",
            tasks.len(),
            context.project,
            context.destination
        );

        let mut receipts = self.submit_all(tasks).await;

        if let Some(options) = &context.wait {
            tracing::info!(
                "⏳ Waiting for exports (poll every {:?}, at most {} polls each)",
                options.poll_interval,
                options.max_polls
            );
            self.wait_for_completion(&mut receipts, options).await;
        }

        let report = RunReport {
            run_stamp: context.run_stamp.clone(),
            project: context.project.clone(),
            destination: context.destination.clone(),
            waited: context.wait.is_some(),
            receipts,
        };

        let manifest = serde_json::to_vec_pretty(&report)?;
        self.storage.write_file(MANIFEST_FILE, &manifest).await?;
        tracing::debug!("Manifest written ({} bytes)", manifest.len());

        self.monitor.log_final();
        Ok(report)
    }
}
