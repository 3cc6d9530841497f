//! Interview sessions keyed by id.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use uuid::Uuid;

use crate::gateway::AiGateway;

use super::error::InterviewError;
use super::machine::{InterviewMachine, MachineSettings, SessionSnapshot, StartOutcome};
use super::types::{InterviewPhase, RoleDescriptor};

/// Finished sessions kept in memory when nothing else is configured.
pub const DEFAULT_MAX_RETAINED_SESSIONS: usize = 20;

#[derive(Default)]
struct Sessions {
    by_id: HashMap<Uuid, Arc<InterviewMachine>>,
    /// Most recently started session, used when a request names none.
    current: Option<Uuid>,
}

/// Shared handle to every interview in the process.
#[derive(Clone)]
pub struct SessionRegistry {
    gateway: Arc<dyn AiGateway>,
    settings: MachineSettings,
    allow_concurrent: bool,
    max_retained: usize,
    cancel: CancellationToken,
    sessions: Arc<RwLock<Sessions>>,
    start_lock: Arc<Mutex<()>>,
}

impl SessionRegistry {
    pub fn new(
        gateway: Arc<dyn AiGateway>,
        settings: MachineSettings,
        allow_concurrent: bool,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gateway,
            settings,
            allow_concurrent,
            max_retained: DEFAULT_MAX_RETAINED_SESSIONS,
            cancel,
            sessions: Arc::new(RwLock::new(Sessions::default())),
            start_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Caps how many sessions stay registered. Active sessions are never evicted.
    pub fn with_retention(mut self, max_sessions: usize) -> Self {
        self.max_retained = max_sessions.max(1);
        self
    }

    fn new_machine(&self, id: Uuid) -> InterviewMachine {
        InterviewMachine::new(
            id,
            Arc::clone(&self.gateway),
            self.settings.clone(),
            self.cancel.child_token(),
        )
    }

    /// Creates and starts a new interview. Nothing is registered on failure.
    pub async fn start_interview(
        &self,
        role: RoleDescriptor,
    ) -> Result<(Uuid, StartOutcome), InterviewError> {
        role.validate()?;
        let _guard = self.start_lock.lock().await;

        if !self.allow_concurrent && self.has_active().await {
            return Err(InterviewError::SessionConflict);
        }

        let id = Uuid::new_v4();
        let machine = Arc::new(self.new_machine(id));

        let outcome = machine.start_interview(role).await?;

        {
            let mut sessions = self.sessions.write().await;
            sessions.by_id.insert(id, machine);
            sessions.current = Some(id);
        }
        info!("Registered interview session {}", id);

        self.evict_stale(id).await;

        Ok((id, outcome))
    }

    /// Looks up `id`, or the current session when `id` is `None`.
    pub async fn get(&self, id: Option<Uuid>) -> Result<Arc<InterviewMachine>, InterviewError> {
        let sessions = self.sessions.read().await;
        id.or(sessions.current)
            .and_then(|key| sessions.by_id.get(&key).cloned())
            .ok_or_else(|| InterviewError::not_found(id))
    }

    /// Looks up `id`, or the current session when `id` is `None`.
    ///
    /// With no id and no current session this returns an unregistered session
    /// that was never started, so callers get the lifecycle error for an
    /// EMPTY interview instead of a lookup failure.
    pub async fn resolve(
        &self,
        id: Option<Uuid>,
    ) -> Result<Arc<InterviewMachine>, InterviewError> {
        if id.is_some() {
            return self.get(id).await;
        }

        let current = {
            let sessions = self.sessions.read().await;
            sessions
                .current
                .and_then(|key| sessions.by_id.get(&key).cloned())
        };
        Ok(current.unwrap_or_else(|| Arc::new(self.new_machine(Uuid::nil()))))
    }

    /// Resets and forgets a session.
    pub async fn discard(&self, id: Uuid) -> Result<(), InterviewError> {
        let machine = {
            let mut sessions = self.sessions.write().await;
            let machine = sessions
                .by_id
                .remove(&id)
                .ok_or_else(|| InterviewError::not_found(Some(id)))?;
            if sessions.current == Some(id) {
                sessions.current = None;
            }
            machine
        };

        machine.reset().await;
        info!("Discarded interview session {}", id);
        Ok(())
    }

    pub async fn list(&self) -> Vec<SessionSnapshot> {
        let machines: Vec<_> = self.sessions.read().await.by_id.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(machines.len());
        for machine in machines {
            snapshots.push(machine.snapshot().await);
        }
        snapshots.sort_by(|a, b| a.state.started_at.cmp(&b.state.started_at));
        snapshots
    }

    /// Drops the oldest inactive sessions beyond the retention cap.
    async fn evict_stale(&self, keep: Uuid) {
        let machines: Vec<_> = self.sessions.read().await.by_id.values().cloned().collect();
        let Some(excess) = machines.len().checked_sub(self.max_retained) else {
            return;
        };
        if excess == 0 {
            return;
        }

        let mut candidates = Vec::new();
        for machine in machines {
            if machine.id() == keep {
                continue;
            }
            let snapshot = machine.snapshot().await;
            if snapshot.phase != InterviewPhase::Active {
                candidates.push((snapshot.state.started_at, machine.id()));
            }
        }
        candidates.sort();

        let mut sessions = self.sessions.write().await;
        for (_, id) in candidates.into_iter().take(excess) {
            sessions.by_id.remove(&id);
            debug!("Evicted interview session {}", id);
        }
    }

    async fn has_active(&self) -> bool {
        let machines: Vec<_> = self.sessions.read().await.by_id.values().cloned().collect();
        for machine in machines {
            if machine.phase().await == InterviewPhase::Active {
                return true;
            }
        }
        false
    }
}
