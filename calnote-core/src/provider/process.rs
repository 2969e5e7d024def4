//! Provider subprocess protocol.
//!
//! Each request spawns the provider executable (e.g. `calnote-provider-google`),
//! writes one JSON request line to its stdin and reads one JSON response from
//! its stdout. Any executable that speaks the protocol can be a provider, and
//! providers manage their own credentials. Core only passes the provider's
//! table from the config file.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use crate::error::{CalNoteError, CalNoteResult};
use crate::event::{Event, RawEvent};
use crate::provider::protocol::{
    Command, CreateEvent, DeleteEvent, FetchEvents, ProviderCommand, Request, Response,
    UpdateEvent,
};
use crate::provider::{CalendarPage, CalendarProvider, DocumentProvider, EventSink, FetchFilter};

pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Debug)]
pub struct ProviderProcess {
    name: String,
    config: serde_json::Map<String, serde_json::Value>,
    timeout: Duration,
}

impl ProviderProcess {
    pub fn new(name: &str, config: serde_json::Map<String, serde_json::Value>) -> Self {
        ProviderProcess {
            name: name.to_string(),
            config,
            timeout: DEFAULT_PROVIDER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn binary_name(&self) -> String {
        format!("calnote-provider-{}", self.name)
    }

    fn binary_path(&self) -> CalNoteResult<std::path::PathBuf> {
        let binary_name = self.binary_name();
        which::which(&binary_name).map_err(|_| CalNoteError::ProviderNotInstalled(binary_name))
    }

    /// Call a typed provider command and return the result.
    ///
    /// The response type is inferred from the command's associated type.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> CalNoteResult<C::Response> {
        timeout(self.timeout, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| CalNoteError::ProviderTimeout(self.timeout.as_secs()))?
    }

    /// Low-level call that sends a command with params and deserializes the response.
    async fn call_raw<P: Serialize, R: serde::de::DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> CalNoteResult<R> {
        let params =
            serde_json::to_value(params).map_err(|e| CalNoteError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| CalNoteError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        tracing::debug!(provider = %self.name, ?command, "Calling provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CalNoteError::Provider(format!("Failed to spawn {}: {}", binary_path.display(), e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| CalNoteError::Provider("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(CalNoteError::Provider(format!(
                "{} exited with status: {}",
                self.binary_name(),
                output.status.code().unwrap_or(-1)
            )));
        }

        parse_response(&String::from_utf8_lossy(&output.stdout))
    }

    fn fetch_command(&self, filter: &FetchFilter) -> FetchEvents {
        FetchEvents {
            provider_config: self.config.clone(),
            from: filter.window.from_rfc3339(),
            to: filter.window.to_rfc3339(),
            page_size: filter.page_size,
            cursor: filter.cursor.clone(),
        }
    }
}

fn parse_response<R: serde::de::DeserializeOwned>(stdout: &str) -> CalNoteResult<R> {
    let stdout = stdout.trim();
    if stdout.is_empty() {
        return Err(CalNoteError::Provider("Provider returned no response".into()));
    }

    let response: Response<R> = serde_json::from_str(stdout)
        .map_err(|e| CalNoteError::Provider(format!("Failed to parse response: {}", e)))?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error { error } => Err(CalNoteError::Provider(error)),
    }
}

#[async_trait]
impl EventSink for ProviderProcess {
    async fn create_event(&self, event: &Event) -> CalNoteResult<Event> {
        let created: RawEvent = self
            .call(CreateEvent {
                provider_config: self.config.clone(),
                event: event.to_raw(),
            })
            .await?;
        Ok(Event::from_raw(created))
    }

    async fn update_event(&self, event: &Event) -> CalNoteResult<()> {
        self.call(UpdateEvent {
            provider_config: self.config.clone(),
            event: event.to_raw(),
        })
        .await
    }

    async fn delete_event(&self, event: &Event) -> CalNoteResult<()> {
        self.call(DeleteEvent {
            provider_config: self.config.clone(),
            event: event.to_raw(),
        })
        .await
    }
}

#[async_trait]
impl CalendarProvider for ProviderProcess {
    async fn fetch(&self, filter: &FetchFilter) -> CalNoteResult<CalendarPage> {
        let response = self.call(self.fetch_command(filter)).await?;
        Ok(CalendarPage {
            events: response.events.into_iter().map(Event::from_raw).collect(),
            next_cursor: response.next_cursor,
        })
    }
}

#[async_trait]
impl DocumentProvider for ProviderProcess {
    async fn fetch(&self, filter: &FetchFilter) -> CalNoteResult<Vec<Event>> {
        let mut command = self.fetch_command(filter);
        command.cursor = None;
        let response = self.call(command).await?;
        Ok(response.events.into_iter().map(Event::from_raw).collect())
    }
}
