//! Named page slots and the visual-state routine.
//!
//! DESIGN
//! ======
//! Each element the widget touches is a [`Slot`]. A [`Page`] maps a slot to
//! an element if the page has one; the routine walks every slot and skips
//! the ones that are missing, so a page that lacks, say, the header button
//! group still gets its icon and text updated.

use std::collections::{BTreeMap, HashMap};

use super::Appearance;

/// Elements the widget keeps in sync with the messaging flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    /// Toggle icon image.
    Icon,
    /// Status label next to the icon.
    StatusText,
    /// Explanatory text under the toggle.
    Description,
    /// Messaging popover region in the page header.
    Popover,
    /// "Message this user" control on profile pages.
    MessageUserButton,
    /// Header button group holding the messaging drawer toggle.
    ButtonGroup,
}

impl Slot {
    pub const ALL: [Slot; 6] = [
        Slot::Icon,
        Slot::StatusText,
        Slot::Description,
        Slot::Popover,
        Slot::MessageUserButton,
        Slot::ButtonGroup,
    ];

    /// CSS selector locating this slot in a rendered page.
    #[must_use]
    pub fn selector(self) -> &'static str {
        match self {
            Self::Icon => "#msg-toggle-icon",
            Self::StatusText => "#msg-toggle-text",
            Self::Description => "#msg-description",
            Self::Popover => "div.popover-region[data-region='popover-region-messages']",
            Self::MessageUserButton => "a#message-user-button",
            Self::ButtonGroup => ".btn-group.header-button-group.mx-3",
        }
    }

    /// Write the appearance into this slot's element.
    pub fn apply(self, element: &mut dyn Element, appearance: &Appearance<'_>) {
        match self {
            Self::Icon => {
                element.set_attribute("src", appearance.icon_url());
                element.set_attribute("alt", appearance.label());
            }
            Self::StatusText => {
                element.set_text(appearance.label());
                element.set_style("color", appearance.color());
                element.set_style("font-weight", "bold");
            }
            Self::Description => element.set_style("color", appearance.color()),
            Self::Popover | Self::MessageUserButton | Self::ButtonGroup => {
                element.set_style("display", if appearance.active { "" } else { "none" });
            }
        }
    }
}

/// Mutable view of one page element.
pub trait Element {
    fn set_attribute(&mut self, name: &str, value: &str);
    fn set_text(&mut self, text: &str);
    /// Set an inline style property. An empty value removes the property.
    fn set_style(&mut self, property: &str, value: &str);
}

/// A page that may or may not contain each slot.
pub trait Page {
    fn element(&mut self, slot: Slot) -> Option<&mut dyn Element>;
}

/// Apply the appearance to every slot the page has.
pub fn apply_visual_state(page: &mut dyn Page, appearance: &Appearance<'_>) {
    for slot in Slot::ALL {
        if let Some(element) = page.element(slot) {
            slot.apply(element, appearance);
        }
    }
}

// =============================================================================
// IN-MEMORY PAGE
// =============================================================================

/// Attribute, text and inline style state of one element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementState {
    pub attributes: BTreeMap<String, String>,
    pub text: Option<String>,
    pub styles: BTreeMap<String, String>,
}

impl ElementState {
    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    #[must_use]
    pub fn style(&self, property: &str) -> Option<&str> {
        self.styles.get(property).map(String::as_str)
    }

    #[must_use]
    pub fn is_hidden(&self) -> bool {
        self.style("display") == Some("none")
    }

    /// Inline `style` attribute text, properties in name order.
    #[must_use]
    pub fn style_text(&self) -> String {
        self.styles
            .iter()
            .map(|(property, value)| format!("{property}: {value};"))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Element for ElementState {
    fn set_attribute(&mut self, name: &str, value: &str) {
        self.attributes.insert(name.to_owned(), value.to_owned());
    }

    fn set_text(&mut self, text: &str) {
        self.text = Some(text.to_owned());
    }

    fn set_style(&mut self, property: &str, value: &str) {
        if value.is_empty() {
            self.styles.remove(property);
        } else {
            self.styles.insert(property.to_owned(), value.to_owned());
        }
    }
}

/// Page holding element state in memory. Used for server-side rendering and
/// for headless controllers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageModel {
    elements: HashMap<Slot, ElementState>,
}

impl PageModel {
    /// A page containing exactly `slots`, each with empty state.
    #[must_use]
    pub fn with_slots(slots: &[Slot]) -> Self {
        Self { elements: slots.iter().map(|slot| (*slot, ElementState::default())).collect() }
    }

    #[must_use]
    pub fn get(&self, slot: Slot) -> Option<&ElementState> {
        self.elements.get(&slot)
    }
}

impl Page for PageModel {
    fn element(&mut self, slot: Slot) -> Option<&mut dyn Element> {
        self.elements
            .get_mut(&slot)
            .map(|element| element as &mut dyn Element)
    }
}

#[cfg(test)]
#[path = "page_test.rs"]
mod tests;
