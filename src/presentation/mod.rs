//! Presentation layer: renders orchestrator state into text for LLM consumption.
//!
//! Rendering is pure. [`Presentation::Brief`] is used after every tool call or
//! action to keep payloads small; [`Presentation::Comprehensive`] is used once,
//! at handshake, to onboard the model with full tool schemas.

pub mod brief;
pub mod comprehensive;
pub mod json;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::stage::{LocalState, Stage};

/// Rendering fidelity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Presentation {
    Brief,
    Comprehensive,
}

/// Everything a renderer may look at.
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub workflow_name: &'a str,
    pub workflow_description: &'a str,
    pub stage: &'a Stage,
    pub state: &'a LocalState,
}

impl Presentation {
    pub fn render(self, content: &str, ctx: &RenderContext<'_>) -> String {
        match self {
            Self::Brief => brief::render(content, ctx.stage, ctx.state),
            Self::Comprehensive => comprehensive::render(content, ctx),
        }
    }
}
