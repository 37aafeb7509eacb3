//! Health-check user: emit a JSON payload and validate the echoed reply

use crate::error::HealthCheckError;
use crate::events::{Environment, RequestEvent};
use crate::user::{User, UserBlueprint, WaitTime};
use crate::users::socketio::SocketIoSession;
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::sync::Arc;
use std::time::Instant;
use surge_config::{HealthCheckConfig, TargetConfig};
use surge_socketio::{ReceivedEvent, SocketIoError};
use tracing::{debug, error, info};

/// Request type reported for every sample
pub const REQUEST_TYPE: &str = "socket.io";

/// Body of the `health-check` event
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheckRequest {
    pub user_id: String,
    pub action: String,
    pub log: String,
}

impl From<&HealthCheckConfig> for HealthCheckRequest {
    fn from(config: &HealthCheckConfig) -> Self {
        Self {
            user_id: config.user_id.clone(),
            action: config.action.clone(),
            log: config.log.clone(),
        }
    }
}

/// User that performs one health-check round trip per task
pub struct HealthCheckUser {
    id: usize,
    session: SocketIoSession,
    config: HealthCheckConfig,
    environment: Arc<Environment>,
}

impl HealthCheckUser {
    pub const CLASS_NAME: &'static str = "HealthCheckUser";

    pub fn new(
        id: usize,
        session: SocketIoSession,
        config: HealthCheckConfig,
        environment: Arc<Environment>,
    ) -> Self {
        Self {
            id,
            session,
            config,
            environment,
        }
    }

    /// User class connecting every instance to `target`
    pub fn blueprint(target: TargetConfig, config: HealthCheckConfig, wait_time: WaitTime) -> UserBlueprint {
        UserBlueprint::new(Self::CLASS_NAME, move |id, environment| {
            let session = SocketIoSession::new(&target);
            Box::new(HealthCheckUser::new(id, session, config.clone(), environment)) as Box<dyn User>
        })
        .with_wait_time(wait_time)
    }

    pub fn session(&self) -> &SocketIoSession {
        &self.session
    }

    /// One round trip: emit, await the reply, validate it, report a sample
    ///
    /// No sample is reported on failure; the error propagates to the caller.
    pub async fn health_check(&mut self) -> Result<(), HealthCheckError> {
        let request = HealthCheckRequest::from(&self.config);
        let body = serde_json::to_value(&request).map_err(HealthCheckError::Encode)?;
        let text = serde_json::to_string(&request).map_err(HealthCheckError::Encode)?;

        let started = Instant::now();
        let client = self.session.client_mut();

        if let Err(e) = client
            .emit(&self.config.event, vec![JsonValue::String(text.clone())])
            .await
        {
            error!(user = self.id, "Failed to emit {}: {}", self.config.event, e);
            return Err(e.into());
        }
        info!(user = self.id, body = %text, "Sent {}", self.config.event);

        let response = match client.receive(self.config.reply_timeout).await {
            Ok(response) => response,
            Err(e @ SocketIoError::ReceiveTimeout(_)) => {
                debug!(
                    user = self.id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "No reply to {}",
                    self.config.event
                );
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let response_time = started.elapsed().as_secs_f64() * 1000.0;

        info!(
            user = self.id,
            event = %response.name,
            data = ?response.first_arg(),
            "Received reply"
        );

        let payload = parse_payload(&response).inspect_err(|e| {
            error!(user = self.id, "{}", e);
        })?;

        if response.name != self.config.reply_event {
            return Err(HealthCheckError::Assertion(HealthCheckError::EVENT_NAME_MISMATCH));
        }
        if payload.get("userBody") != Some(&body) {
            return Err(HealthCheckError::Assertion(HealthCheckError::PAYLOAD_MISMATCH));
        }

        self.environment.fire_request(RequestEvent::success(
            REQUEST_TYPE,
            self.config.event.clone(),
            response_time,
            response.char_len(),
        ));

        Ok(())
    }
}

/// Reply body: a JSON text argument is parsed, a JSON object is taken as-is
fn parse_payload(event: &ReceivedEvent) -> Result<JsonValue, HealthCheckError> {
    use serde::de::Error as _;

    match event.first_arg() {
        Some(JsonValue::String(text)) => serde_json::from_str(text).map_err(HealthCheckError::Decode),
        Some(value @ JsonValue::Object(_)) => Ok(value.clone()),
        Some(other) => Err(HealthCheckError::Decode(serde_json::Error::custom(format!(
            "expected JSON text or object, got {}",
            other
        )))),
        None => Err(HealthCheckError::Decode(serde_json::Error::custom(
            "reply carries no payload",
        ))),
    }
}

#[async_trait::async_trait]
impl User for HealthCheckUser {
    async fn on_start(&mut self) {
        self.session.start().await;
    }

    async fn run_task(&mut self) -> anyhow::Result<()> {
        self.health_check().await?;
        Ok(())
    }

    async fn on_stop(&mut self) {
        self.session.stop().await;
    }
}
