use leptos::prelude::*;

/// Severity of a status line message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

impl StatusKind {
    pub fn color(self) -> &'static str {
        match self {
            Self::Info => "#9aa4b2",
            Self::Success => "#2ecc71",
            Self::Error => "#e74c3c",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub kind: StatusKind,
}

/// Single status line under the header. The latest message wins.
#[derive(Clone, Copy)]
pub struct StatusBus(pub RwSignal<Option<StatusMessage>>);

impl StatusBus {
    pub fn new() -> Self {
        Self(RwSignal::new(None))
    }

    pub fn info(&self, text: impl Into<String>) {
        self.push(text.into(), StatusKind::Info);
    }

    pub fn success(&self, text: impl Into<String>) {
        self.push(text.into(), StatusKind::Success);
    }

    pub fn error(&self, text: impl Into<String>) {
        self.push(text.into(), StatusKind::Error);
    }

    fn push(&self, text: String, kind: StatusKind) {
        self.0.set(Some(StatusMessage { text, kind }));
    }
}

impl Default for StatusBus {
    fn default() -> Self {
        Self::new()
    }
}
