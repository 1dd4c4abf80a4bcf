//! Push a rendered configuration template to a device.

use std::sync::Arc;

use log::{debug, info};
use serde::Serialize;

use super::{Operation, OperationKind, OperationResult};
use crate::config::DeviceDescriptor;
use crate::error::OperationError;
use crate::platform::PlatformDefinition;
use crate::session::Session;
use crate::template::{TemplateParams, TemplateRenderer};

/// Payload of a successful configuration push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigOutput {
    /// Commands sent in configuration mode, in order.
    pub commands: Vec<String>,

    /// Combined device output.
    pub output: String,
}

/// Render `template` and split it into commands, dropping blank lines.
pub fn render_commands(
    renderer: &dyn TemplateRenderer,
    template: &str,
    params: &TemplateParams,
) -> Result<Vec<String>, OperationError> {
    let text = renderer.render(template, params)?;
    let commands: Vec<String> = text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();

    if commands.is_empty() {
        return Err(OperationError::EmptyCommandSet {
            template: template.to_string(),
        });
    }
    Ok(commands)
}

/// Render, enter config mode, send, persist, leave config mode.
///
/// Nothing is sent when rendering fails. Nothing is retried once a command
/// has been sent.
pub async fn apply<S: Session>(
    session: &mut S,
    platform: &PlatformDefinition,
    renderer: &dyn TemplateRenderer,
    template: &str,
    params: &TemplateParams,
) -> OperationResult<ConfigOutput> {
    try_apply(session, platform, renderer, template, params)
        .await
        .into()
}

async fn try_apply<S: Session>(
    session: &mut S,
    platform: &PlatformDefinition,
    renderer: &dyn TemplateRenderer,
    template: &str,
    params: &TemplateParams,
) -> Result<ConfigOutput, OperationError> {
    let commands = render_commands(renderer, template, params)?;

    let mut output = Vec::with_capacity(4);
    output.push(session.enter_config_mode().await?);
    output.push(session.run_many(&commands).await?);
    debug!("persisting with '{}'", platform.persist_command);
    output.push(session.run(platform.persist_command).await?);
    output.push(session.exit_config_mode().await?);

    output.retain(|chunk| !chunk.is_empty());
    Ok(ConfigOutput {
        commands,
        output: output.join("\n"),
    })
}

/// Configuration push of one template with fixed parameters.
#[derive(Clone)]
pub struct ConfigPush {
    renderer: Arc<dyn TemplateRenderer>,
    template: String,
    params: TemplateParams,
}

impl ConfigPush {
    pub fn new(
        renderer: Arc<dyn TemplateRenderer>,
        template: impl Into<String>,
        params: TemplateParams,
    ) -> Self {
        Self {
            renderer,
            template: template.into(),
            params,
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

impl Operation for ConfigPush {
    type Output = ConfigOutput;

    fn kind(&self) -> OperationKind {
        OperationKind::Config
    }

    async fn execute<S: Session>(
        &self,
        session: &mut S,
        device: &DeviceDescriptor,
    ) -> OperationResult<ConfigOutput> {
        info!("{}: applying template '{}'", device.name, self.template);
        apply(
            session,
            device.vendor.platform(),
            self.renderer.as_ref(),
            &self.template,
            &self.params,
        )
        .await
    }
}
