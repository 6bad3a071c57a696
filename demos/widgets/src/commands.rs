//! Line commands driving the headless board
//!
//! Targets are either `#elementId` or a handler name, optionally narrowed by
//! the bound element's `value` attribute: `handleCalculatorInput=7`.

use anyhow::{anyhow, bail, Context};
use dom_dispatch::{EventType, NodeId, Runtime};

use crate::app::App;
use crate::state::AppState;

pub const HELP: &str = "\
commands:
  show [Component]        print the board (or one component)
  state                   print the state as JSON
  click <target>          click an element
  type <target> <text>    focus an input and type into it
  set <target> <value>    set an input's value (fires input and change)
  focus <target>          focus an element
  blur                    drop focus
  help                    this text
  quit                    exit

targets: #elementId, or a handler name such as incrementCounter
         (handleCalculatorInput=7 picks the bound element with value 7)";

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Show(Option<String>),
    State,
    Click(String),
    Type(String, String),
    Set(String, String),
    Focus(String),
    Blur,
    Help,
    Quit,
}

impl Command {
    /// Parse one input line; blank lines yield `None`
    pub fn parse(line: &str) -> anyhow::Result<Option<Self>> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };
        let target = || -> anyhow::Result<String> {
            let target = rest.split_whitespace().next().unwrap_or_default();
            if target.is_empty() {
                bail!("{verb}: missing target");
            }
            Ok(target.to_string())
        };
        // Everything after the target, verbatim
        let argument = || {
            rest.split_once(char::is_whitespace)
                .map(|(_, text)| text.to_string())
                .unwrap_or_default()
        };

        let command = match verb {
            "show" => Command::Show((!rest.is_empty()).then(|| rest.to_string())),
            "state" => Command::State,
            "click" => Command::Click(target()?),
            "type" => Command::Type(target()?, argument()),
            "set" => Command::Set(target()?, argument()),
            "focus" => Command::Focus(target()?),
            "blur" => Command::Blur,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => bail!("unknown command '{other}' (try 'help')"),
        };
        Ok(Some(command))
    }
}

/// What the caller should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Print this and keep going
    Print(String),
    Continue,
    Quit,
}

/// Resolve a target for `kind` events
pub fn resolve_target(rt: &Runtime<AppState>, target: &str, kind: EventType) -> Option<NodeId> {
    if let Some(id) = target.strip_prefix('#') {
        return rt.element_by_id(id);
    }
    let (handler, value) = match target.split_once('=') {
        Some((handler, value)) => (handler, Some(value)),
        None => (target, None),
    };
    let doc = rt.document();
    doc.query_attribute(doc.body(), kind.binding_attribute(), Some(handler))
        .into_iter()
        .find(|&node| value.is_none_or(|value| doc.attribute(node, "value") == Some(value)))
}

fn require(rt: &Runtime<AppState>, target: &str, kind: EventType) -> anyhow::Result<NodeId> {
    resolve_target(rt, target, kind).ok_or_else(|| anyhow!("no element matches '{target}'"))
}

fn rendered(rt: &Runtime<AppState>) -> Outcome {
    match rt.last_render() {
        Some(stats) => Outcome::Print(format!(
            "rendered {} skipped {} replaced {} patched {}",
            stats.rendered, stats.skipped, stats.replaced, stats.patched
        )),
        None => Outcome::Continue,
    }
}

/// Run a command against the app
pub fn execute(app: &mut App, command: Command) -> anyhow::Result<Outcome> {
    let outcome = match command {
        Command::Show(None) => Outcome::Print(app.html()),
        Command::Show(Some(component)) => {
            let rt = app.runtime();
            let node = rt
                .component_nodes(&component)
                .into_iter()
                .next()
                .with_context(|| format!("component '{component}' is not mounted"))?;
            Outcome::Print(rt.document().outer_html(node))
        }
        Command::State => Outcome::Print(serde_json::to_string_pretty(app.runtime().state())?),
        Command::Click(target) => {
            let rt = app.runtime_mut();
            let node = require(rt, &target, EventType::Click)?;
            let before = rt.render_passes();
            if rt.click(node)? == 0 {
                Outcome::Print(format!("'{target}' has no click handler (or is disabled)"))
            } else if rt.render_passes() == before {
                Outcome::Continue
            } else {
                rendered(rt)
            }
        }
        Command::Type(target, text) => {
            let rt = app.runtime_mut();
            let node = require(rt, &target, EventType::Input)?;
            rt.type_text(node, &text)?;
            rendered(rt)
        }
        Command::Set(target, value) => {
            let rt = app.runtime_mut();
            let node = require(rt, &target, EventType::Input)
                .or_else(|_| require(rt, &target, EventType::Change))?;
            rt.set_value(node, &value)?;
            rendered(rt)
        }
        Command::Focus(target) => {
            let rt = app.runtime_mut();
            let node = require(rt, &target, EventType::Input)
                .or_else(|_| require(rt, &target, EventType::Click))?;
            if !rt.focus(node) {
                bail!("'{target}' cannot take focus");
            }
            Outcome::Continue
        }
        Command::Blur => {
            app.runtime_mut().blur();
            Outcome::Continue
        }
        Command::Help => Outcome::Print(HELP.to_string()),
        Command::Quit => Outcome::Quit,
    };
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(
            Command::parse("show CounterWidget").unwrap(),
            Some(Command::Show(Some("CounterWidget".into())))
        );
        assert_eq!(
            Command::parse("click incrementCounter").unwrap(),
            Some(Command::Click("incrementCounter".into()))
        );
        assert_eq!(
            Command::parse("type #mirrorInput hello world").unwrap(),
            Some(Command::Type("#mirrorInput".into(), "hello world".into()))
        );
        assert_eq!(Command::parse("q").unwrap(), Some(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert!(Command::parse("click").is_err());
        assert!(Command::parse("dance").is_err());
    }
}
