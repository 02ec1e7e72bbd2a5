use serde::Serialize;
use std::pin::Pin;

/// A boxed async stream, used for streamed assistant job output.
pub type BoxStream<'a, T> = Pin<Box<dyn futures_core::Stream<Item = T> + Send + 'a>>;

/// Events yielded while streaming an assistant job.
///
/// `Completed` and `Failed` are terminal: no further events follow them.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum AssistantStreamEvent {
    /// An incremental text fragment from the assistant.
    #[serde(rename = "delta")]
    Delta { text: String },

    /// The job finished successfully.
    #[serde(rename = "completed")]
    Completed,

    /// The job failed mid-stream. `reason` is the remote-provided detail.
    #[serde(rename = "failed")]
    Failed { reason: String },
}
