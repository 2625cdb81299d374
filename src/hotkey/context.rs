//! Element contexts and the exclusion policy applied to them
//!
//! Hotkeys must not hijack typing. When focus sits in an editable element
//! a binding only fires if it explicitly allows that kind of element.

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Classification of the element that had keyboard focus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementContext {
    /// Anything that does not take keyboard input
    #[default]
    PlainElement,
    /// Free-text `input` elements and `textarea`
    TextInput,
    /// Checkbox, radio, button, range and similar `input` elements
    NonTextInput,
    /// Elements with `contenteditable`
    ContentEditable,
    /// `select` elements
    SelectElement,
}

impl ElementContext {
    pub const ALL: [ElementContext; 5] = [
        ElementContext::PlainElement,
        ElementContext::TextInput,
        ElementContext::NonTextInput,
        ElementContext::ContentEditable,
        ElementContext::SelectElement,
    ];

    /// Whether bindings are suppressed here unless explicitly allowed
    pub fn excluded_by_default(self) -> bool {
        matches!(
            self,
            ElementContext::TextInput
                | ElementContext::ContentEditable
                | ElementContext::SelectElement
        )
    }

    /// The flag for this context within a [`ContextSet`]
    pub fn flag(self) -> ContextSet {
        match self {
            ElementContext::PlainElement => ContextSet::PLAIN_ELEMENT,
            ElementContext::TextInput => ContextSet::TEXT_INPUT,
            ElementContext::NonTextInput => ContextSet::NON_TEXT_INPUT,
            ElementContext::ContentEditable => ContextSet::CONTENT_EDITABLE,
            ElementContext::SelectElement => ContextSet::SELECT_ELEMENT,
        }
    }
}

bitflags! {
    /// Set of element contexts a binding is explicitly allowed in
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ContextSet: u8 {
        const PLAIN_ELEMENT = 0b0_0001;
        const TEXT_INPUT = 0b0_0010;
        const NON_TEXT_INPUT = 0b0_0100;
        const CONTENT_EDITABLE = 0b0_1000;
        const SELECT_ELEMENT = 0b1_0000;
    }
}

impl Default for ContextSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl ContextSet {
    /// The contexts in this set, in declaration order
    pub fn contexts(self) -> impl Iterator<Item = ElementContext> {
        ElementContext::ALL
            .into_iter()
            .filter(move |context| self.contains(context.flag()))
    }
}

impl From<ElementContext> for ContextSet {
    fn from(context: ElementContext) -> Self {
        context.flag()
    }
}

impl FromIterator<ElementContext> for ContextSet {
    fn from_iter<I: IntoIterator<Item = ElementContext>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ContextSet::empty(), |set, context| set | context.flag())
    }
}

/// Decide whether a binding with the given allow-list may fire in `context`
pub fn permits(allowed: ContextSet, context: ElementContext) -> bool {
    allowed.contains(context.flag()) || !context.excluded_by_default()
}

/// `input` types that do not accept free text
const NON_TEXT_INPUT_TYPES: &[&str] = &[
    "button", "checkbox", "color", "file", "image", "radio", "range", "reset", "submit",
];

/// Description of the focused element as reported by the event bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusedElement {
    /// Tag name, e.g. `INPUT` or `div`
    pub tag_name: String,
    /// The `type` attribute of an `input` element
    #[serde(default)]
    pub input_type: Option<String>,
    #[serde(default)]
    pub content_editable: bool,
}

impl FocusedElement {
    pub fn classify(&self) -> ElementContext {
        match self.tag_name.to_ascii_lowercase().as_str() {
            "input" => {
                let input_type = self
                    .input_type
                    .as_deref()
                    .map(str::to_ascii_lowercase)
                    .unwrap_or_default();
                if NON_TEXT_INPUT_TYPES.contains(&input_type.as_str()) {
                    ElementContext::NonTextInput
                } else {
                    ElementContext::TextInput
                }
            }
            "textarea" => ElementContext::TextInput,
            "select" => ElementContext::SelectElement,
            _ if self.content_editable => ElementContext::ContentEditable,
            _ => ElementContext::PlainElement,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(tag_name: &str, input_type: Option<&str>) -> FocusedElement {
        FocusedElement {
            tag_name: tag_name.to_string(),
            input_type: input_type.map(str::to_string),
            content_editable: false,
        }
    }

    #[test]
    fn test_default_policy() {
        let none = ContextSet::empty();
        assert!(permits(none, ElementContext::PlainElement));
        assert!(permits(none, ElementContext::NonTextInput));
        assert!(!permits(none, ElementContext::TextInput));
        assert!(!permits(none, ElementContext::ContentEditable));
        assert!(!permits(none, ElementContext::SelectElement));
    }

    #[test]
    fn test_allow_list_overrides_default() {
        assert!(permits(ContextSet::TEXT_INPUT, ElementContext::TextInput));
        assert!(!permits(ContextSet::TEXT_INPUT, ElementContext::ContentEditable));
        assert!(permits(
            ContextSet::CONTENT_EDITABLE | ContextSet::SELECT_ELEMENT,
            ElementContext::SelectElement
        ));
    }

    #[test]
    fn test_context_set_collect() {
        let set: ContextSet = [ElementContext::SelectElement, ElementContext::TextInput]
            .into_iter()
            .collect();
        assert_eq!(set, ContextSet::TEXT_INPUT | ContextSet::SELECT_ELEMENT);
        assert_eq!(
            set.contexts().collect::<Vec<_>>(),
            vec![ElementContext::TextInput, ElementContext::SelectElement]
        );
    }

    #[test]
    fn test_classify_inputs() {
        assert_eq!(element("INPUT", Some("text")).classify(), ElementContext::TextInput);
        assert_eq!(element("input", None).classify(), ElementContext::TextInput);
        assert_eq!(element("input", Some("search")).classify(), ElementContext::TextInput);
        assert_eq!(
            element("input", Some("Checkbox")).classify(),
            ElementContext::NonTextInput
        );
        assert_eq!(element("input", Some("range")).classify(), ElementContext::NonTextInput);
        assert_eq!(element("TEXTAREA", None).classify(), ElementContext::TextInput);
        assert_eq!(element("select", None).classify(), ElementContext::SelectElement);
    }

    #[test]
    fn test_classify_content_editable_and_plain() {
        let mut div = element("div", None);
        assert_eq!(div.classify(), ElementContext::PlainElement);

        div.content_editable = true;
        assert_eq!(div.classify(), ElementContext::ContentEditable);

        assert_eq!(element("body", None).classify(), ElementContext::PlainElement);
    }

    #[test]
    fn test_context_serialization() {
        let json = serde_json::to_string(&ElementContext::ContentEditable).unwrap();
        assert_eq!(json, "\"content_editable\"");
    }
}
