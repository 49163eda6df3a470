//! Prompt sources for model providers and chat sessions
//!
//! Providers never reach into a cartridge directly. They take anything that
//! can name itself and compile a system prompt, and session-specific text is
//! layered on top without touching the source.

/// Something that can produce a system prompt
pub trait PromptSource {
    fn name(&self) -> &str;

    fn compile_prompt(&self) -> String;
}

/// Adds text before and/or after another source's prompt
#[derive(Debug, Clone)]
pub struct LayeredPrompt<'a, S: PromptSource + ?Sized> {
    inner: &'a S,
    preamble: Option<String>,
    postscript: Option<String>,
}

impl<'a, S: PromptSource + ?Sized> LayeredPrompt<'a, S> {
    pub fn new(inner: &'a S) -> Self {
        Self {
            inner,
            preamble: None,
            postscript: None,
        }
    }

    pub fn with_preamble(mut self, text: &str) -> Self {
        self.preamble = Some(text.to_string());
        self
    }

    pub fn with_postscript(mut self, text: &str) -> Self {
        self.postscript = Some(text.to_string());
        self
    }

    pub fn inner(&self) -> &S {
        self.inner
    }
}

impl<S: PromptSource + ?Sized> PromptSource for LayeredPrompt<'_, S> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn compile_prompt(&self) -> String {
        let mut parts = Vec::new();
        if let Some(ref pre) = self.preamble
            && !pre.is_empty()
        {
            parts.push(pre.clone());
        }
        parts.push(self.inner.compile_prompt());
        if let Some(ref post) = self.postscript
            && !post.is_empty()
        {
            parts.push(post.clone());
        }
        parts.join("\n\n")
    }
}
