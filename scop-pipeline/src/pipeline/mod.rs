use std::{pin::Pin, sync::Arc};

use futures::{Stream, StreamExt};

/// One item flowing through a pipeline, tagged with its 1-based line in the
/// originating CSV so failures can be located.
#[derive(Debug, Clone)]
pub struct Envelope<T> {
    pub payload: T,
    pub line: u64,
}

impl<T> Envelope<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Envelope<U> {
        Envelope {
            payload: f(self.payload),
            line: self.line,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    #[error("source error: {0}")]
    Source(String),
    #[error("transform error: {0}")]
    Transform(String),
    #[error("sink error: {0}")]
    Sink(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EnvelopeStream<T> = Pin<Box<dyn Stream<Item = Result<Envelope<T>, PipelineError>> + Send>>;

#[async_trait::async_trait]
pub trait Source<T>: Send + Sync {
    async fn stream(&self) -> EnvelopeStream<T>;
}

#[async_trait::async_trait]
pub trait Transform<I, O>: Send + Sync {
    async fn apply(&self, input: Envelope<I>) -> Result<Envelope<O>, PipelineError>;
}

/// Terminal stage. Upstream errors are the sink's to log or propagate.
#[async_trait::async_trait]
pub trait Sink<T>: Send + Sync {
    async fn run<S>(&self, input: S) -> Result<(), PipelineError>
    where
        S: Stream<Item = Result<Envelope<T>, PipelineError>> + Send + Unpin + 'static;
}

/// Source, same-type transform chain and sink for one batch unit
/// (typically one system's daily series).
pub struct Pipeline<S, T, K> {
    pub name: String,
    pub source: S,
    pub transforms: Vec<Arc<dyn Transform<T, T> + Send + Sync>>,
    pub sink: K,
}

impl<T, S, K> Pipeline<S, T, K>
where
    T: Send + 'static,
    S: Source<T> + Send + Sync + 'static,
    K: Sink<T> + Send + Sync + 'static,
{
    pub async fn run(self) -> Result<(), PipelineError> {
        tracing::debug!(pipeline = %self.name, transforms = self.transforms.len(), "pipeline started");
        let mut stream = self.source.stream().await;

        for t in self.transforms {
            stream = Box::pin(stream.then(move |item| {
                let t = t.clone();
                async move {
                    match item {
                        Ok(env) => t.apply(env).await,
                        Err(e) => Err(e),
                    }
                }
            }));
        }

        let result = self.sink.run(stream).await;
        match &result {
            Ok(()) => tracing::debug!(pipeline = %self.name, "pipeline finished"),
            Err(e) => tracing::error!(pipeline = %self.name, error = %e, "pipeline failed"),
        }
        result
    }
}
