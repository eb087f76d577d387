//! Field, repetition and component values
//!
//! Values are kept in canonical form: trailing empty subcomponents,
//! components, repetitions and fields are dropped as soon as they appear.
//! `A^B^^` and `A^B` therefore build equal values, while an empty part in the
//! middle (`A^^C`) is kept.

use serde::{Deserialize, Serialize};

pub(crate) fn trim_trailing<T>(items: &mut Vec<T>, is_empty: impl Fn(&T) -> bool) {
    while items.last().is_some_and(&is_empty) {
        items.pop();
    }
}

/// Element at `index`, growing the vector with defaults as needed
fn grow_to<T: Default>(items: &mut Vec<T>, index: usize) -> &mut T {
    if items.len() <= index {
        items.resize_with(index + 1, T::default);
    }
    &mut items[index]
}

/// One component: a list of subcomponents
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Component {
    subcomponents: Vec<String>,
}

impl Component {
    /// A component holding a single value
    pub fn new(value: impl Into<String>) -> Self {
        Self::from_subcomponents(vec![value.into()])
    }

    /// A component from its subcomponents
    pub fn from_subcomponents(subcomponents: Vec<String>) -> Self {
        let mut component = Self { subcomponents };
        component.normalize();
        component
    }

    /// Subcomponent values
    pub fn subcomponents(&self) -> &[String] {
        &self.subcomponents
    }

    /// Subcomponent by 1-based number
    pub fn subcomponent(&self, number: usize) -> Option<&str> {
        self.subcomponents
            .get(number.saturating_sub(1))
            .map(String::as_str)
    }

    /// First subcomponent, or the empty string
    pub fn value(&self) -> &str {
        self.subcomponent(1).unwrap_or_default()
    }

    /// Set a subcomponent by 1-based number
    pub fn set_subcomponent(&mut self, number: usize, value: impl Into<String>) {
        *grow_to(&mut self.subcomponents, number.saturating_sub(1)) = value.into();
        self.normalize();
    }

    /// Whether every subcomponent is empty
    pub fn is_empty(&self) -> bool {
        self.subcomponents.is_empty()
    }

    fn normalize(&mut self) {
        trim_trailing(&mut self.subcomponents, String::is_empty);
    }
}

/// One repetition of a field: a list of components
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Repetition {
    components: Vec<Component>,
}

impl Repetition {
    /// A repetition holding a single value
    pub fn new(value: impl Into<String>) -> Self {
        Self::from_components(vec![Component::new(value)])
    }

    /// A repetition from its components
    pub fn from_components(components: Vec<Component>) -> Self {
        let mut repetition = Self { components };
        repetition.normalize();
        repetition
    }

    /// Components
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// Component by 1-based number
    pub fn component(&self, number: usize) -> Option<&Component> {
        self.components.get(number.saturating_sub(1))
    }

    /// Value at a 1-based component and subcomponent
    pub fn value(&self, component: usize, subcomponent: usize) -> Option<&str> {
        self.component(component)?.subcomponent(subcomponent)
    }

    /// Set a value at a 1-based component and subcomponent
    pub fn set_value(&mut self, component: usize, subcomponent: usize, value: impl Into<String>) {
        grow_to(&mut self.components, component.saturating_sub(1))
            .set_subcomponent(subcomponent, value);
        self.normalize();
    }

    /// Whether every component is empty
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    fn normalize(&mut self) {
        trim_trailing(&mut self.components, Component::is_empty);
    }
}

/// One field: a list of repetitions
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Field {
    repetitions: Vec<Repetition>,
}

impl Field {
    /// A field holding a single value
    pub fn new(value: impl Into<String>) -> Self {
        Self::from_repetitions(vec![Repetition::new(value)])
    }

    /// A field from its repetitions
    pub fn from_repetitions(repetitions: Vec<Repetition>) -> Self {
        let mut field = Self { repetitions };
        field.normalize();
        field
    }

    /// Repetitions
    pub fn repetitions(&self) -> &[Repetition] {
        &self.repetitions
    }

    /// Repetition by 0-based index
    pub fn repetition(&self, index: usize) -> Option<&Repetition> {
        self.repetitions.get(index)
    }

    /// Value at a 0-based repetition, 1-based component and subcomponent
    pub fn value(&self, repetition: usize, component: usize, subcomponent: usize) -> Option<&str> {
        self.repetition(repetition)?.value(component, subcomponent)
    }

    /// First value of the field, or `None` if it is empty
    pub fn first(&self) -> Option<&str> {
        self.value(0, 1, 1)
    }

    /// Set a value at a 0-based repetition, 1-based component and subcomponent
    pub fn set_value(
        &mut self,
        repetition: usize,
        component: usize,
        subcomponent: usize,
        value: impl Into<String>,
    ) {
        grow_to(&mut self.repetitions, repetition).set_value(component, subcomponent, value);
        self.normalize();
    }

    /// Append a repetition
    pub fn push_repetition(&mut self, repetition: Repetition) {
        self.repetitions.push(repetition);
        self.normalize();
    }

    /// Whether the field has no content
    pub fn is_empty(&self) -> bool {
        self.repetitions.is_empty()
    }

    fn normalize(&mut self) {
        trim_trailing(&mut self.repetitions, Repetition::is_empty);
    }
}
