//! Background what-if simulation worker.
//!
//! Parameter updates are debounced: a prediction is requested only once no
//! new update has arrived for the debounce window. Every update bumps a
//! generation counter; an outcome is delivered only if its generation is
//! still the latest when it is read.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::predictions::RiskAssessment;
use crate::domain::{estimate_cluster, ClusterWeights, LifestyleInput};
use crate::ports::{GatewayError, PredictionBackend};
use crate::{CardiolensError, Result};

/// Simulation tuning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationConfig {
    /// Quiet period after the last update before a request is sent
    pub debounce: Duration,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
        }
    }
}

impl SimulationConfig {
    /// Load config overrides from environment (best-effort).
    ///
    /// Supported:
    /// - CARDIOLENS_SIMULATION_DEBOUNCE_MS
    #[must_use]
    pub fn from_env_or_default() -> Self {
        let mut cfg = Self::default();

        if let Some(ms) = std::env::var("CARDIOLENS_SIMULATION_DEBOUNCE_MS")
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            cfg.debounce = Duration::from_millis(ms);
        }

        cfg
    }
}

/// Slider state of the simulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationParams {
    pub input: LifestyleInput,
    /// Age in years, for the cluster age bands
    pub age: u32,
}

/// Result of one debounced simulation request.
#[derive(Debug)]
pub struct SimulationOutcome {
    pub generation: u64,
    /// Cluster estimate from the simulation weight table
    pub cluster: u8,
    pub assessment: std::result::Result<RiskAssessment, GatewayError>,
}

type Tagged = (u64, SimulationParams);

/// Handle to a running simulation worker.
///
/// Dropping the handle stops the worker.
pub struct SimulationHandle {
    updates: UnboundedSender<Tagged>,
    outcomes: UnboundedReceiver<SimulationOutcome>,
    generation: Arc<AtomicU64>,
    _task: JoinHandle<()>,
}

impl SimulationHandle {
    /// Queue new parameters. Returns the generation assigned to them.
    ///
    /// # Errors
    /// Returns [`CardiolensError::Validation`] for out-of-range codes, or
    /// [`CardiolensError::WorkerStopped`] if the worker has exited.
    pub fn submit(&self, params: SimulationParams) -> Result<u64> {
        params
            .input
            .validate()
            .map_err(|errors| CardiolensError::Validation(errors.join("; ")))?;

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.updates
            .send((generation, params))
            .map_err(|_| CardiolensError::WorkerStopped)?;
        Ok(generation)
    }

    /// Generation of the most recent submission; 0 before any.
    #[must_use]
    pub fn latest_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Wait for the next outcome of the latest submission.
    ///
    /// # Errors
    /// Returns [`CardiolensError::WorkerStopped`] if the worker has exited.
    pub async fn next_outcome(&mut self) -> Result<SimulationOutcome> {
        loop {
            let outcome = self.outcomes.recv().await.ok_or(CardiolensError::WorkerStopped)?;
            if outcome.generation == self.latest_generation() {
                return Ok(outcome);
            }
            tracing::debug!(generation = outcome.generation, "dropping superseded simulation result");
        }
    }

    /// Non-blocking variant of [`next_outcome`](Self::next_outcome).
    #[must_use]
    pub fn try_next(&mut self) -> Option<SimulationOutcome> {
        while let Ok(outcome) = self.outcomes.try_recv() {
            if outcome.generation == self.latest_generation() {
                return Some(outcome);
            }
        }
        None
    }
}

/// Debouncing simulation worker.
pub struct SimulationWorker;

impl SimulationWorker {
    /// Spawn the worker on the current tokio runtime.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    pub fn spawn<P>(backend: Arc<P>, config: SimulationConfig) -> SimulationHandle
    where
        P: PredictionBackend + 'static,
    {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        let generation = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(Self::run(
            backend,
            config,
            update_rx,
            outcome_tx,
            Arc::clone(&generation),
        ));

        SimulationHandle {
            updates: update_tx,
            outcomes: outcome_rx,
            generation,
            _task: task,
        }
    }

    async fn run<P>(
        backend: Arc<P>,
        config: SimulationConfig,
        mut updates: UnboundedReceiver<Tagged>,
        outcomes: UnboundedSender<SimulationOutcome>,
        latest: Arc<AtomicU64>,
    ) where
        P: PredictionBackend,
    {
        while let Some(mut pending) = updates.recv().await {
            // Restart the window on every update. Concurrent submits can
            // arrive out of order, so the highest generation wins.
            loop {
                match tokio::time::timeout(config.debounce, updates.recv()).await {
                    Ok(Some(next)) => {
                        if next.0 > pending.0 {
                            pending = next;
                        }
                    }
                    Ok(None) => return,
                    Err(_) => break,
                }
            }

            let (generation, params) = pending;
            if generation != latest.load(Ordering::SeqCst) {
                continue;
            }

            let cluster = estimate_cluster(
                &params.input.cluster_features(),
                params.age,
                &ClusterWeights::SIMULATION,
            );
            tracing::debug!(generation, cluster, "running simulation");

            let assessment = backend
                .predict_lifestyle_one(&params.input)
                .await
                .map(RiskAssessment::from);

            if generation != latest.load(Ordering::SeqCst) {
                tracing::debug!(generation, "simulation superseded while in flight");
                continue;
            }

            let outcome = SimulationOutcome {
                generation,
                cluster,
                assessment,
            };
            if outcomes.send(outcome).is_err() {
                break;
            }
        }
        tracing::debug!("simulation worker stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ClinicalInput, CompareResult, PredictionResponse, RiskClass, ShapExplanation};
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeModel {
        calls: AtomicUsize,
        seen: Mutex<Vec<LifestyleInput>>,
        latency: Duration,
    }

    #[async_trait]
    impl PredictionBackend for FakeModel {
        async fn predict_lifestyle(
            &self,
            batch: &[LifestyleInput],
        ) -> std::result::Result<Vec<PredictionResponse>, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen.lock().expect("Lock").extend_from_slice(batch);
            tokio::time::sleep(self.latency).await;

            let risk = if batch[0].smoke == 1 { 0.8 } else { 0.3 };
            Ok(vec![PredictionResponse {
                risk_score: risk,
                risk_level: RiskClass::from_probability(risk),
                model_used: "fake".to_string(),
                confidence: risk.max(1.0 - risk),
                contributing_factors: None,
            }])
        }

        async fn predict_clinical(
            &self,
            _batch: &[ClinicalInput],
        ) -> std::result::Result<Vec<PredictionResponse>, GatewayError> {
            Err(GatewayError::Client("unused".to_string()))
        }

        async fn compare_lifestyle(&self, _input: &LifestyleInput) -> std::result::Result<CompareResult, GatewayError> {
            Err(GatewayError::Client("unused".to_string()))
        }

        async fn compare_clinical(&self, _input: &ClinicalInput) -> std::result::Result<CompareResult, GatewayError> {
            Err(GatewayError::Client("unused".to_string()))
        }

        async fn explain(&self, _input: &ClinicalInput) -> std::result::Result<ShapExplanation, GatewayError> {
            Err(GatewayError::Client("unused".to_string()))
        }
    }

    fn params(smoke: u8) -> SimulationParams {
        SimulationParams {
            input: LifestyleInput {
                gender: 1,
                age_bin: 3,
                bmi_class: 2,
                map_class: 2,
                cholesterol: 2,
                gluc: 1,
                smoke,
                alco: 0,
                active: 1,
                history: 0,
            },
            age: 60,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_updates_send_one_request() {
        let backend = Arc::new(FakeModel::default());
        let mut handle = SimulationWorker::spawn(Arc::clone(&backend), SimulationConfig::default());

        for _ in 0..5 {
            handle.submit(params(0)).expect("Should submit");
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        let last = handle.submit(params(1)).expect("Should submit");

        // Still inside the window of the last update.
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);

        let outcome = handle.next_outcome().await.expect("Should deliver");
        assert_eq!(outcome.generation, last);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.seen.lock().expect("Lock")[0].smoke, 1);

        let assessment = outcome.assessment.expect("Should predict");
        assert_eq!(assessment.health_score, 20);
    }

    #[tokio::test(start_paused = true)]
    async fn test_out_of_order_updates_keep_newest() {
        let backend = Arc::new(FakeModel::default());
        let mut handle = SimulationWorker::spawn(Arc::clone(&backend), SimulationConfig::default());

        // Two racing submits took generations 4 and 5 but sent 5 first.
        handle.generation.store(5, Ordering::SeqCst);
        handle.updates.send((5, params(1))).expect("Should send");
        handle.updates.send((4, params(0))).expect("Should send");

        let outcome = handle.next_outcome().await.expect("Should deliver");
        assert_eq!(outcome.generation, 5);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.seen.lock().expect("Lock")[0].smoke, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_result_superseded() {
        let backend = Arc::new(FakeModel {
            latency: Duration::from_secs(2),
            ..FakeModel::default()
        });
        let mut handle = SimulationWorker::spawn(Arc::clone(&backend), SimulationConfig::default());

        handle.submit(params(0)).expect("Should submit");
        // Let the first request start, then change a slider mid-flight.
        tokio::time::sleep(Duration::from_millis(700)).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
        let latest = handle.submit(params(1)).expect("Should submit");

        let outcome = handle.next_outcome().await.expect("Should deliver");
        assert_eq!(outcome.generation, latest);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert!(handle.try_next().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulation_cluster_weights() {
        let backend = Arc::new(FakeModel::default());
        let mut handle = SimulationWorker::spawn(backend, SimulationConfig::default());

        handle.submit(params(1)).expect("Should submit");
        let outcome = handle.next_outcome().await.expect("Should deliver");

        // chol 1 + bmi 1 + bp 2 + smoke 2 + age 60 → 1 = 7 → cluster 2
        assert_eq!(outcome.cluster, 2);
    }

    #[tokio::test]
    async fn test_invalid_params_rejected() {
        let handle = SimulationWorker::spawn(Arc::new(FakeModel::default()), SimulationConfig::default());
        let mut bad = params(0);
        bad.input.cholesterol = 9;

        let result = handle.submit(bad);
        assert!(matches!(result, Err(CardiolensError::Validation(_))));
        assert_eq!(handle.latest_generation(), 0);
    }

    #[test]
    fn test_default_debounce() {
        assert_eq!(SimulationConfig::default().debounce, Duration::from_millis(500));
    }
}
