//! The page a [`HotReloader`](crate::HotReloader) patches.

use swarm_core::error::{SwarmError, SwarmResult};

/// Style elements and reload control of a page.
pub trait Document: Send {
    /// Whether a style element with this id exists.
    fn has_style(&self, id: &str) -> bool;

    /// Create a style element with this id, append it to the head and set
    /// its text to `css`.
    fn append_style(&mut self, id: &str, css: &str) -> SwarmResult<()>;

    /// Replace the whole text content of an existing style element.
    fn replace_style_text(&mut self, id: &str, css: &str) -> SwarmResult<()>;

    /// Reload the whole page.
    fn reload(&mut self) -> SwarmResult<()>;
}

/// A `<style>` element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleElement {
    pub id: String,
    pub text: String,
}

/// Document held in memory: the ordered style elements of the head and the
/// number of reloads requested.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocument {
    head: Vec<StyleElement>,
    reloads: usize,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing style element.
    pub fn with_style(mut self, id: impl Into<String>, css: impl Into<String>) -> Self {
        self.head.push(StyleElement {
            id: id.into(),
            text: css.into(),
        });
        self
    }

    /// Style elements in head order.
    pub fn styles(&self) -> &[StyleElement] {
        &self.head
    }

    /// Text of the style element with this id.
    pub fn style_text(&self, id: &str) -> Option<&str> {
        self.head
            .iter()
            .find(|style| style.id == id)
            .map(|style| style.text.as_str())
    }

    /// How many times the page was reloaded.
    pub fn reload_count(&self) -> usize {
        self.reloads
    }
}

impl Document for InMemoryDocument {
    fn has_style(&self, id: &str) -> bool {
        self.head.iter().any(|style| style.id == id)
    }

    fn append_style(&mut self, id: &str, css: &str) -> SwarmResult<()> {
        self.head.push(StyleElement {
            id: id.to_string(),
            text: css.to_string(),
        });
        Ok(())
    }

    fn replace_style_text(&mut self, id: &str, css: &str) -> SwarmResult<()> {
        let style = self
            .head
            .iter_mut()
            .find(|style| style.id == id)
            .ok_or_else(|| SwarmError::Document(format!("no style element with id '{id}'")))?;
        style.text = css.to_string();
        Ok(())
    }

    fn reload(&mut self) -> SwarmResult<()> {
        self.reloads += 1;
        Ok(())
    }
}
