//! Interaction events delivered to bound handlers

use crate::dom::NodeId;

/// Interaction kinds recognized by the listener binder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventType {
    /// Activation (mouse click, enter on a button)
    Click,
    /// Value edit of a form control
    Input,
    /// Committed value change of a form control
    Change,
    /// Form submission
    Submit,
}

impl EventType {
    /// Every recognized kind, in scan order
    pub const ALL: [EventType; 4] = [
        EventType::Click,
        EventType::Input,
        EventType::Change,
        EventType::Submit,
    ];

    /// DOM event name, e.g. `click`
    pub fn name(self) -> &'static str {
        match self {
            EventType::Click => "click",
            EventType::Input => "input",
            EventType::Change => "change",
            EventType::Submit => "submit",
        }
    }

    /// Declarative binding attribute, e.g. `data-onclick`
    pub fn binding_attribute(self) -> &'static str {
        match self {
            EventType::Click => "data-onclick",
            EventType::Input => "data-oninput",
            EventType::Change => "data-onchange",
            EventType::Submit => "data-onsubmit",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// An event as seen by a handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: EventType,
    /// Node the interaction happened on
    pub target: NodeId,
    /// Node whose binding is being invoked (differs from `target` while bubbling)
    pub current_target: NodeId,
    /// Value of the target when the event was dispatched
    ///
    /// Live value for text controls, the `value` attribute otherwise.
    pub value: Option<String>,
}

impl DomEvent {
    /// Target value, or an empty string
    pub fn value(&self) -> &str {
        self.value.as_deref().unwrap_or_default()
    }
}
