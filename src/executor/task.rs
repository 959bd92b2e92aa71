//! Task representation.

use crate::cancel::CancellationToken;

/// Executable body of a [`Task`].
///
/// Implemented for every `FnOnce(&CancellationToken) -> anyhow::Result<()>`
/// closure; implement it directly for types that carry their own state.
/// The token is fired when the owning manager shuts down; honouring it is up
/// to the body.
pub trait TaskBody: Send {
    fn execute(self: Box<Self>, cancel: &CancellationToken) -> anyhow::Result<()>;
}

impl<F> TaskBody for F
where
    F: FnOnce(&CancellationToken) -> anyhow::Result<()> + Send,
{
    fn execute(self: Box<Self>, cancel: &CancellationToken) -> anyhow::Result<()> {
        (*self)(cancel)
    }
}

/// A named unit of work. Stats are aggregated by `id`, so tasks sharing an
/// id share one stats record.
pub struct Task {
    id: String,
    name: String,
    body: Box<dyn TaskBody>,
}

impl Task {
    pub fn new<F>(id: impl Into<String>, name: impl Into<String>, f: F) -> Self
    where
        F: FnOnce(&CancellationToken) -> anyhow::Result<()> + Send + 'static,
    {
        Self::from_body(id, name, f)
    }

    pub fn from_body<B>(id: impl Into<String>, name: impl Into<String>, body: B) -> Self
    where
        B: TaskBody + 'static,
    {
        Task {
            id: id.into(),
            name: name.into(),
            body: Box::new(body),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn into_parts(self) -> (String, String, Box<dyn TaskBody>) {
        (self.id, self.name, self.body)
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}
