use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::warn;

/// Health reporting for the asynchronous loops of a service.
///
/// Each loop registers a component with a deadline and must report healthy
/// more often than that deadline. The process is healthy only while every
/// registered component has a live report; a loop that stops reporting
/// (wedged, dead) fails the check once its deadline lapses.
///
/// Liveness and readiness are deliberately not merged into one state; give
/// each probe its own registry.
#[derive(Clone)]
pub struct HealthRegistry {
    name: String,
    components: Arc<RwLock<HashMap<String, ComponentStatus>>>,
    sender: mpsc::Sender<HealthMessage>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ComponentStatus {
    /// Registered, no report yet
    Starting,
    /// Healthy as long as the deadline is in the future
    HealthyUntil(Instant),
    /// Explicitly reported unhealthy
    Unhealthy,
}

impl ComponentStatus {
    pub fn is_healthy(&self) -> bool {
        match self {
            ComponentStatus::HealthyUntil(until) => *until > Instant::now(),
            _ => false,
        }
    }
}

struct HealthMessage {
    component: String,
    status: ComponentStatus,
}

#[derive(Debug)]
pub struct HealthStatus {
    pub healthy: bool,
    pub components: HashMap<String, ComponentStatus>,
}

impl IntoResponse for HealthStatus {
    fn into_response(self) -> Response {
        let body = format!("{self:?}");
        match self.healthy {
            true => (StatusCode::OK, body),
            false => (StatusCode::INTERNAL_SERVER_ERROR, body),
        }
        .into_response()
    }
}

#[derive(Clone)]
pub struct HealthHandle {
    component: String,
    deadline: Duration,
    sender: mpsc::Sender<HealthMessage>,
}

impl HealthHandle {
    /// Report healthy, asynchronously. Must be called more frequently than
    /// the component's deadline.
    pub async fn report_healthy(&self) {
        self.report_status(ComponentStatus::HealthyUntil(Instant::now() + self.deadline))
            .await
    }

    pub async fn report_status(&self, status: ComponentStatus) {
        let message = HealthMessage {
            component: self.component.clone(),
            status,
        };
        if let Err(err) = self.sender.send(message).await {
            warn!("failed to report health status: {}", err);
        }
    }

    /// Report healthy from non-async contexts (e.g. librdkafka callbacks).
    pub fn report_healthy_blocking(&self) {
        let message = HealthMessage {
            component: self.component.clone(),
            status: ComponentStatus::HealthyUntil(Instant::now() + self.deadline),
        };
        if let Err(err) = self.sender.try_send(message) {
            warn!("failed to report health status: {}", err);
        }
    }
}

impl HealthRegistry {
    pub fn new(name: &str) -> Self {
        let (sender, mut receiver) = mpsc::channel::<HealthMessage>(16);
        let components: Arc<RwLock<HashMap<String, ComponentStatus>>> = Default::default();

        let writer = components.clone();
        tokio::spawn(async move {
            while let Some(message) = receiver.recv().await {
                if let Ok(mut map) = writer.write() {
                    map.insert(message.component, message.status);
                }
            }
        });

        Self {
            name: name.to_string(),
            components,
            sender,
        }
    }

    /// Register a new component. It starts unhealthy and must report within
    /// its deadline for the registry to pass.
    pub async fn register(&self, component: String, deadline: Duration) -> HealthHandle {
        let handle = HealthHandle {
            component: component.clone(),
            deadline,
            sender: self.sender.clone(),
        };
        let message = HealthMessage {
            component,
            status: ComponentStatus::Starting,
        };
        if let Err(err) = self.sender.send(message).await {
            warn!("failed to register component in {}: {}", self.name, err);
        }
        handle
    }

    pub fn get_status(&self) -> HealthStatus {
        let components = match self.components.read() {
            Ok(map) => map.clone(),
            Err(_) => {
                return HealthStatus {
                    healthy: false,
                    components: HashMap::new(),
                }
            }
        };
        let healthy = !components.is_empty() && components.values().all(|c| c.is_healthy());
        HealthStatus {
            healthy,
            components,
        }
    }
}
