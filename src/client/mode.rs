//! Client mode controller.
//!
//! USER mode exposes discovery tools; SERVER mode exposes the connected
//! workflow's tools. Mode, the discovery set, and the connected workflow are
//! one value advanced by [`transition`], so they can never disagree.

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::tools::{ToolDescriptor, ToolParameters};
use crate::workflow::WorkflowDescriptor;

pub const SEARCH_TOOL: &str = "search_remote_servers";
pub const CONNECT_TOOL: &str = "establish_connection";
pub const DISCONNECT_TOOL: &str = "disconnect_server";

const CONNECT_DESCRIPTION: &str = "Connect to a server and switch to SERVER mode.

This will:
- Establish a session with the selected server
- Expose the server's tools and stages
- Switch to SERVER mode, where you can use the server's workflow tools and disconnect when done

After connecting, use the server's tools to help the user accomplish their goal.";

const DISCONNECT_DESCRIPTION: &str = "Disconnect from the current server and switch back to USER mode.

This will close the session, clear the server's tools, and let you search for other servers.

Use this when the task is complete or the user needs a different server.";

/// The connected workflow while in SERVER mode.
#[derive(Debug, Clone, PartialEq)]
pub struct Connection {
    pub workflow: String,
    pub server_url: String,
    pub current_stage: String,
    /// Tools most recently advertised by the server.
    pub tools: Vec<ToolDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum Mode {
    #[default]
    User,
    Server(Connection),
}

/// Display label used in logs and error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum ModeKind {
    User,
    Server,
}

/// Everything the controller tracks.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ModeState {
    pub mode: Mode,
    /// Most recent search results; overwritten by every search.
    pub in_context_servers: Vec<WorkflowDescriptor>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ModeEvent {
    SearchCompleted(Vec<WorkflowDescriptor>),
    Connected(Connection),
    /// The server reported its current stage and, optionally, a new tool list.
    ServerUpdate {
        current_stage: String,
        tools: Option<Vec<ToolDescriptor>>,
    },
    /// The server-side session is gone; only `disconnect_server` remains usable.
    SessionEnded,
    Disconnected,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ModeError {
    #[error("'{event}' is not valid in {mode} mode")]
    WrongMode { event: &'static str, mode: ModeKind },
    #[error("Server '{0}' not found in current context. Search first.")]
    UnknownServer(String),
}

impl ModeState {
    pub fn kind(&self) -> ModeKind {
        match self.mode {
            Mode::User => ModeKind::User,
            Mode::Server(_) => ModeKind::Server,
        }
    }

    pub fn connection(&self) -> Option<&Connection> {
        match &self.mode {
            Mode::Server(connection) => Some(connection),
            Mode::User => None,
        }
    }

    pub fn current_workflow(&self) -> Option<&str> {
        self.connection().map(|c| c.workflow.as_str())
    }

    pub fn find_server(&self, name: &str) -> Option<&WorkflowDescriptor> {
        self.in_context_servers.iter().find(|s| s.name == name)
    }

    /// The exact tool set to hand the model in the current mode.
    pub fn exposed_tools(&self) -> Vec<ToolDescriptor> {
        match &self.mode {
            Mode::User => user_tools(&self.in_context_servers),
            Mode::Server(connection) => {
                let mut tools = connection.tools.clone();
                tools.push(ToolDescriptor {
                    name: DISCONNECT_TOOL.into(),
                    description: DISCONNECT_DESCRIPTION.into(),
                    input_schema: ToolParameters::empty().schema,
                });
                tools
            }
        }
    }
}

fn user_tools(servers: &[WorkflowDescriptor]) -> Vec<ToolDescriptor> {
    let mut tools = vec![ToolDescriptor {
        name: SEARCH_TOOL.into(),
        description: "Search for available remote servers/workflows that can help accomplish a task"
            .into(),
        input_schema: ToolParameters::object()
            .string(
                "search_query",
                "What you're looking for (e.g., 'real estate', 'booking', 'shopping')",
                true,
            )
            .build()
            .schema,
    }];

    if !servers.is_empty() {
        let options = servers.iter().map(|s| {
            let description = if s.description.is_empty() {
                "No description"
            } else {
                s.description.as_str()
            };
            (s.name.as_str(), description)
        });
        tools.push(ToolDescriptor {
            name: CONNECT_TOOL.into(),
            description: CONNECT_DESCRIPTION.into(),
            input_schema: ToolParameters::object()
                .described_choice("server_name", options, true)
                .build()
                .schema,
        });
    }

    tools
}

/// Advance the controller. Pure; rejected events leave `state` unchanged.
pub fn transition(state: &ModeState, event: ModeEvent) -> Result<ModeState, ModeError> {
    let wrong_mode = |event: &'static str| ModeError::WrongMode {
        event,
        mode: state.kind(),
    };

    match (&state.mode, event) {
        (Mode::User, ModeEvent::SearchCompleted(servers)) => Ok(ModeState {
            mode: Mode::User,
            in_context_servers: servers,
        }),

        (Mode::User, ModeEvent::Connected(connection)) => {
            if state.find_server(&connection.workflow).is_none() {
                return Err(ModeError::UnknownServer(connection.workflow));
            }
            Ok(ModeState {
                mode: Mode::Server(connection),
                in_context_servers: state.in_context_servers.clone(),
            })
        }

        (
            Mode::Server(connection),
            ModeEvent::ServerUpdate {
                current_stage,
                tools,
            },
        ) => {
            let mut connection = connection.clone();
            connection.current_stage = current_stage;
            if let Some(tools) = tools {
                connection.tools = tools;
            }
            Ok(ModeState {
                mode: Mode::Server(connection),
                in_context_servers: state.in_context_servers.clone(),
            })
        }

        (Mode::Server(connection), ModeEvent::SessionEnded) => {
            let mut connection = connection.clone();
            connection.tools.clear();
            Ok(ModeState {
                mode: Mode::Server(connection),
                in_context_servers: state.in_context_servers.clone(),
            })
        }

        // Disconnecting always lands in USER with an empty discovery set.
        (_, ModeEvent::Disconnected) => Ok(ModeState::default()),

        (Mode::Server(_), ModeEvent::SearchCompleted(_)) => Err(wrong_mode("search")),
        (Mode::Server(_), ModeEvent::Connected(_)) => Err(wrong_mode("connect")),
        (Mode::User, ModeEvent::ServerUpdate { .. }) => Err(wrong_mode("server_update")),
        (Mode::User, ModeEvent::SessionEnded) => Err(wrong_mode("session_ended")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server(name: &str) -> WorkflowDescriptor {
        WorkflowDescriptor {
            name: name.into(),
            description: format!("{name} workflow"),
            url: "http://test".into(),
        }
    }

    fn connection(workflow: &str) -> Connection {
        Connection {
            workflow: workflow.into(),
            server_url: "http://test".into(),
            current_stage: "search".into(),
            tools: vec![ToolDescriptor {
                name: "search_properties".into(),
                description: String::new(),
                input_schema: ToolParameters::empty().schema,
            }],
        }
    }

    fn names(state: &ModeState) -> Vec<String> {
        state.exposed_tools().into_iter().map(|t| t.name).collect()
    }

    #[test]
    fn user_mode_without_servers_only_searches() {
        let state = ModeState::default();
        assert_eq!(state.kind(), ModeKind::User);
        assert_eq!(names(&state), [SEARCH_TOOL]);
    }

    #[test]
    fn search_results_constrain_connect_choices() {
        let state = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow"), server("travel")]),
        )
        .unwrap();
        assert_eq!(names(&state), [SEARCH_TOOL, CONNECT_TOOL]);

        let connect = &state.exposed_tools()[1];
        let choices: Vec<&str> = connect.input_schema["properties"]["server_name"]["oneOf"]
            .as_array()
            .unwrap()
            .iter()
            .map(|o| o["const"].as_str().unwrap())
            .collect();
        assert_eq!(choices, ["zillow", "travel"]);

        let state = transition(&state, ModeEvent::SearchCompleted(vec![])).unwrap();
        assert_eq!(names(&state), [SEARCH_TOOL]);
    }

    #[test]
    fn connect_switches_tool_set_entirely() {
        let searched = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow")]),
        )
        .unwrap();
        let connected = transition(&searched, ModeEvent::Connected(connection("zillow"))).unwrap();

        assert_eq!(connected.kind(), ModeKind::Server);
        assert_eq!(connected.current_workflow(), Some("zillow"));
        assert_eq!(names(&connected), ["search_properties", DISCONNECT_TOOL]);
    }

    #[test]
    fn connect_requires_discovered_server() {
        let err = transition(&ModeState::default(), ModeEvent::Connected(connection("zillow")))
            .unwrap_err();
        assert_eq!(err, ModeError::UnknownServer("zillow".into()));
    }

    #[test]
    fn server_update_refreshes_tools_only_when_present() {
        let searched = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow")]),
        )
        .unwrap();
        let connected = transition(&searched, ModeEvent::Connected(connection("zillow"))).unwrap();

        let same = transition(
            &connected,
            ModeEvent::ServerUpdate {
                current_stage: "search".into(),
                tools: None,
            },
        )
        .unwrap();
        assert_eq!(names(&same), ["search_properties", DISCONNECT_TOOL]);

        let moved = transition(
            &connected,
            ModeEvent::ServerUpdate {
                current_stage: "portfolio".into(),
                tools: Some(vec![]),
            },
        )
        .unwrap();
        assert_eq!(moved.connection().unwrap().current_stage, "portfolio");
        assert_eq!(names(&moved), [DISCONNECT_TOOL]);
    }

    #[test]
    fn ended_session_leaves_only_disconnect() {
        let searched = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow")]),
        )
        .unwrap();
        let connected = transition(&searched, ModeEvent::Connected(connection("zillow"))).unwrap();
        let ended = transition(&connected, ModeEvent::SessionEnded).unwrap();

        assert_eq!(ended.kind(), ModeKind::Server);
        assert_eq!(ended.current_workflow(), Some("zillow"));
        assert_eq!(names(&ended), [DISCONNECT_TOOL]);

        let err = transition(&ModeState::default(), ModeEvent::SessionEnded).unwrap_err();
        assert_eq!(err.to_string(), "'session_ended' is not valid in USER mode");
    }

    #[test]
    fn disconnect_clears_discovery_set() {
        let searched = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow")]),
        )
        .unwrap();
        let connected = transition(&searched, ModeEvent::Connected(connection("zillow"))).unwrap();
        let back = transition(&connected, ModeEvent::Disconnected).unwrap();

        assert_eq!(back, ModeState::default());
        assert_eq!(names(&back), [SEARCH_TOOL]);
    }

    #[test]
    fn search_in_server_mode_is_rejected() {
        let searched = transition(
            &ModeState::default(),
            ModeEvent::SearchCompleted(vec![server("zillow")]),
        )
        .unwrap();
        let connected = transition(&searched, ModeEvent::Connected(connection("zillow"))).unwrap();
        let err = transition(&connected, ModeEvent::SearchCompleted(vec![])).unwrap_err();
        assert_eq!(err.to_string(), "'search' is not valid in SERVER mode");
    }
}
