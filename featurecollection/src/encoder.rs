use std::{fmt, str::FromStr};

use tokio::{
    io::{AsyncWrite, AsyncWriteExt},
    sync::{Mutex, mpsc, oneshot},
    task::JoinHandle,
};

use crate::{
    error::{EncoderError, FeatureError, FinalizeError},
    feature::Feature,
};

const HEADER: &[u8] = br#"{"type":"FeatureCollection","features":["#;
const FOOTER: &[u8] = b"]}";

/// Intake queue size used by [`FeatureCollectionEncoder::listen`].
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Append-only output; `shutdown` is the explicit close.
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

/// How each feature body is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EncodeMode {
    /// Standard places response summary.
    Summary,
    /// The original record, reparsed and reserialized.
    #[default]
    Raw,
}

impl FromStr for EncodeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "spr" | "summary" => Ok(EncodeMode::Summary),
            "raw" => Ok(EncodeMode::Raw),
            other => Err(format!("unknown encode mode {other:?}, expected spr or raw")),
        }
    }
}

impl fmt::Display for EncodeMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeMode::Summary => write!(f, "spr"),
            EncodeMode::Raw => write!(f, "raw"),
        }
    }
}

pub struct EncoderOptions {
    pub mode: EncodeMode,
    pub sink: BoxedSink,
}

impl EncoderOptions {
    pub fn new(mode: EncodeMode, sink: impl AsyncWrite + Send + Unpin + 'static) -> Self {
        Self {
            mode,
            sink: Box::new(sink),
        }
    }

    /// Raw mode to process stdout.
    pub fn stdout() -> Self {
        Self::new(EncodeMode::Raw, tokio::io::stdout())
    }
}

struct SinkState {
    /// `None` once closed.
    sink: Option<BoxedSink>,
    /// Features that reached the write step, failed or not.
    attempted: u64,
    /// Bodies fully appended. Decides whether a separator is needed.
    written: u64,
}

/// Streams features into one `FeatureCollection` document.
///
/// The header is written by [`FeatureCollectionEncoder::new`], the footer by
/// [`FeatureCollectionEncoder::close`]. Between the two, any number of tasks
/// may call [`FeatureCollectionEncoder::write_feature`]; only the append is
/// serialized.
pub struct FeatureCollectionEncoder {
    mode: EncodeMode,
    state: Mutex<SinkState>,
}

/// Handles returned by [`FeatureCollectionEncoder::listen`].
pub struct EncoderChannels<F> {
    /// Feature intake. Clone for multiple producers.
    pub features: mpsc::Sender<F>,
    /// Completion signal. Features already queued are still written.
    pub done: oneshot::Sender<()>,
    /// Per-feature and finalize errors. Closed when the loop exits.
    pub errors: mpsc::UnboundedReceiver<EncoderError>,
    pub task: JoinHandle<()>,
}

impl<F> EncoderChannels<F> {
    /// Signals completion and waits for the loop, returning every reported error.
    pub async fn finish(self) -> Vec<EncoderError> {
        let EncoderChannels {
            features,
            done,
            mut errors,
            task,
        } = self;
        drop(features);
        let _ = done.send(());

        let mut collected = Vec::new();
        while let Some(e) = errors.recv().await {
            collected.push(e);
        }
        if let Err(e) = task.await {
            log::error!("encoder task failed: {:#}", e);
        }
        collected
    }
}

impl FeatureCollectionEncoder {
    /// Writes the collection header. On failure the sink is dropped unclosed.
    pub async fn new(options: EncoderOptions) -> Result<Self, EncoderError> {
        let EncoderOptions { mode, mut sink } = options;
        sink.write_all(HEADER).await.map_err(EncoderError::Open)?;
        log::debug!("feature collection opened, mode {}", mode);

        Ok(Self {
            mode,
            state: Mutex::new(SinkState {
                sink: Some(sink),
                attempted: 0,
                written: 0,
            }),
        })
    }

    pub fn mode(&self) -> EncodeMode {
        self.mode
    }

    pub async fn written(&self) -> u64 {
        self.state.lock().await.written
    }

    pub async fn attempted(&self) -> u64 {
        self.state.lock().await.attempted
    }

    pub async fn is_closed(&self) -> bool {
        self.state.lock().await.sink.is_none()
    }

    /// Appends one feature body, preceded by a comma unless it is the first.
    pub async fn write_feature<F>(&self, feature: &F) -> Result<(), EncoderError>
    where
        F: Feature + ?Sized,
    {
        let buf = self.encode_body(feature)?;

        let mut guard = self.state.lock().await;
        let state = &mut *guard;
        let sink = state.sink.as_mut().ok_or(EncoderError::Closed)?;

        state.attempted += 1;
        let out = if state.written > 0 { &buf[..] } else { &buf[1..] };
        sink.write_all(out).await.map_err(EncoderError::Write)?;
        state.written += 1;
        Ok(())
    }

    /// Serializes the body behind a leading separator byte so the append is a
    /// single write either way.
    fn encode_body<F>(&self, feature: &F) -> Result<Vec<u8>, FeatureError>
    where
        F: Feature + ?Sized,
    {
        let mut buf = vec![b','];
        match self.mode {
            EncodeMode::Summary => {
                let spr = feature.spr()?;
                serde_json::to_writer(&mut buf, &spr)?;
            }
            EncodeMode::Raw => {
                let value: serde_json::Value = serde_json::from_slice(feature.bytes())?;
                serde_json::to_writer(&mut buf, &value)?;
            }
        }
        Ok(buf)
    }

    /// Writes the footer and closes the sink. The close is attempted even if
    /// the footer write fails.
    pub async fn close(&self) -> Result<(), EncoderError> {
        let mut state = self.state.lock().await;
        let mut sink = state.sink.take().ok_or(EncoderError::Closed)?;

        let footer = sink.write_all(FOOTER).await.err();
        let close = sink.shutdown().await.err();
        drop(sink);
        log::debug!(
            "feature collection closed after {} of {} features",
            state.written,
            state.attempted
        );

        match (footer, close) {
            (None, None) => Ok(()),
            (footer, close) => Err(FinalizeError { footer, close }.into()),
        }
    }

    /// Moves the encoder onto a background task that writes features in
    /// arrival order until completion is signalled.
    pub fn listen<F>(self) -> EncoderChannels<F>
    where
        F: Feature + Send + Sync + 'static,
    {
        self.listen_with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn listen_with_capacity<F>(self, capacity: usize) -> EncoderChannels<F>
    where
        F: Feature + Send + Sync + 'static,
    {
        let (features, feature_rx) = mpsc::channel(capacity);
        let (done, done_rx) = oneshot::channel();
        let (error_tx, errors) = mpsc::unbounded_channel();

        let task =
            tokio::spawn(async move { self.inner_loop(feature_rx, done_rx, error_tx).await });

        EncoderChannels {
            features,
            done,
            errors,
            task,
        }
    }

    async fn inner_loop<F>(
        self,
        mut feature_rx: mpsc::Receiver<F>,
        mut done_rx: oneshot::Receiver<()>,
        error_tx: mpsc::UnboundedSender<EncoderError>,
    ) where
        F: Feature + Send + Sync + 'static,
    {
        let mut intake_open = true;
        loop {
            tokio::select! {
                biased;
                feature = feature_rx.recv(), if intake_open => match feature {
                    Some(feature) => {
                        if let Err(e) = self.write_feature(&feature).await {
                            log::warn!("write_feature error: {:#}", e);
                            let _ = error_tx.send(e);
                        }
                    }
                    None => intake_open = false,
                },
                signal = &mut done_rx => {
                    if signal.is_err() {
                        log::warn!("completion handle dropped without a signal, finalizing");
                    }
                    break;
                },
            }
        }

        // sends after this point fail; anything already enqueued is written
        feature_rx.close();
        while let Some(feature) = feature_rx.recv().await {
            if let Err(e) = self.write_feature(&feature).await {
                log::warn!("write_feature error: {:#}", e);
                let _ = error_tx.send(e);
            }
        }

        if let Err(e) = self.close().await {
            log::error!("close error: {:#}", e);
            let _ = error_tx.send(e);
        }
    }
}

#[cfg(test)]
#[path = "encoder_test.rs"]
mod encoder_test;
