//! The shared `Idle`/`Lobby`/`InGame` state read by the GUI-ingress task
//! and written by the server-ingress task, following the same "small
//! shared mutex" idiom `backbone-lib/src/middle_layer.rs`'s
//! `ConnectionState` uses to cross its two tasks.

use tokio::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No `Hello` observed yet.
    Idle,
    Lobby,
    InGame,
}

pub struct Arbiter(Mutex<Phase>);

impl Arbiter {
    pub fn new() -> Self {
        Arbiter(Mutex::new(Phase::Idle))
    }

    pub async fn get(&self) -> Phase {
        *self.0.lock().await
    }

    pub async fn set(&self, phase: Phase) {
        *self.0.lock().await = phase;
    }
}

impl Default for Arbiter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn starts_idle_and_observes_transitions() {
        let arbiter = Arbiter::new();
        assert_eq!(arbiter.get().await, Phase::Idle);
        arbiter.set(Phase::Lobby).await;
        assert_eq!(arbiter.get().await, Phase::Lobby);
        arbiter.set(Phase::InGame).await;
        assert_eq!(arbiter.get().await, Phase::InGame);
    }
}
