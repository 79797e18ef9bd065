//! [`AudioElement`] backed by rodio, fetching clips over HTTP

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{mpsc as std_mpsc, Arc};
use std::time::Duration;
use anyhow::{anyhow, Context, Result};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tokio::sync::mpsc;

use super::audio::{AudioElement, AudioEvent};

const POSITION_POLL: Duration = Duration::from_millis(250);

pub struct RodioElement {
    handle: OutputStreamHandle,
    /// Dropping this stops the thread that owns the output stream
    shutdown: Option<std_mpsc::Sender<()>>,
    http: reqwest::Client,
    events: mpsc::UnboundedSender<AudioEvent>,
    source: Option<String>,
    sink: Option<Arc<Sink>>,
    /// Bumped whenever the source changes; stale loads compare against it
    generation: Arc<AtomicU64>,
    /// Set by the poller once the current clip has played out
    finished: Arc<AtomicBool>,
    volume: f32,
}

impl RodioElement {
    pub fn new(events: mpsc::UnboundedSender<AudioEvent>, volume: f32) -> Result<Self> {
        let (handle_tx, handle_rx) = std_mpsc::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel::<()>();

        // OutputStream is not Send, so it lives on its own thread
        std::thread::Builder::new()
            .name("audio-output".to_string())
            .spawn(move || match OutputStream::try_default() {
                Ok((_stream, handle)) => {
                    let _ = handle_tx.send(Ok(handle));
                    let _ = shutdown_rx.recv();
                    tracing::debug!("Audio output thread exiting");
                }
                Err(e) => {
                    let _ = handle_tx.send(Err(anyhow!("Failed to open audio output: {}", e)));
                }
            })
            .context("Failed to spawn audio output thread")?;

        let handle = handle_rx
            .recv()
            .context("Audio output thread exited before reporting")??;

        Ok(Self {
            handle,
            shutdown: Some(shutdown_tx),
            http: reqwest::Client::new(),
            events,
            source: None,
            sink: None,
            generation: Arc::new(AtomicU64::new(0)),
            finished: Arc::new(AtomicBool::new(false)),
            volume,
        })
    }

    fn stop_current(&mut self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn start_load(&mut self, url: String) -> Result<()> {
        let sink = Arc::new(Sink::try_new(&self.handle).context("Failed to create audio sink")?);
        sink.set_volume(self.volume);
        self.sink = Some(sink.clone());
        self.finished.store(false, Ordering::SeqCst);
        let finished = self.finished.clone();

        let generation = self.generation.clone();
        let expected = generation.load(Ordering::SeqCst);
        let events = self.events.clone();
        let http = self.http.clone();

        tokio::spawn(async move {
            let is_current = || generation.load(Ordering::SeqCst) == expected;

            let source = match fetch_clip(&http, &url).await {
                Ok(source) => source,
                Err(e) => {
                    if is_current() {
                        let _ = events.send(AudioEvent::Error { message: format!("{:#}", e) });
                    }
                    return;
                }
            };
            if !is_current() {
                return;
            }

            let duration_secs = source.total_duration().map(|d| d.as_secs_f64());
            let _ = events.send(AudioEvent::LoadedMetadata { duration_secs });
            sink.append(source);

            let mut ticker = tokio::time::interval(POSITION_POLL);
            loop {
                ticker.tick().await;
                if !is_current() {
                    return;
                }
                if sink.empty() {
                    finished.store(true, Ordering::SeqCst);
                    let _ = events.send(AudioEvent::Ended);
                    return;
                }
                let _ = events.send(AudioEvent::TimeUpdate {
                    position_secs: sink.get_pos().as_secs_f64(),
                });
            }
        });
        Ok(())
    }
}

async fn fetch_clip(http: &reqwest::Client, url: &str) -> Result<Decoder<Cursor<Vec<u8>>>> {
    let bytes = http
        .get(url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("Failed to fetch preview clip {}", url))?
        .bytes()
        .await
        .context("Failed to read preview clip")?;
    Decoder::new(Cursor::new(bytes.to_vec())).context("Failed to decode preview clip")
}

impl AudioElement for RodioElement {
    fn set_source(&mut self, url: &str) {
        self.stop_current();
        self.source = Some(url.to_string());
    }

    fn play(&mut self) -> Result<()> {
        if let Some(sink) = &self.sink {
            if !self.finished.load(Ordering::SeqCst) {
                sink.play();
                return Ok(());
            }
            // Played out: the poller is gone, so load the clip again from the start
            self.stop_current();
        }
        let url = self.source.clone().ok_or_else(|| anyhow!("No audio source set"))?;
        self.start_load(url)
    }

    fn pause(&mut self) {
        if let Some(sink) = &self.sink {
            sink.pause();
        }
    }

    fn seek(&mut self, position_secs: f64) {
        if let Some(sink) = &self.sink {
            if let Err(e) = sink.try_seek(Duration::from_secs_f64(position_secs.max(0.0))) {
                tracing::warn!(error = %e, position_secs, "Seek in preview clip failed");
            }
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
        if let Some(sink) = &self.sink {
            sink.set_volume(self.volume);
        }
    }

    fn clear_source(&mut self) {
        self.stop_current();
        self.source = None;
    }

    fn release(&mut self) {
        self.stop_current();
        self.source = None;
        self.shutdown.take();
    }
}

impl Drop for RodioElement {
    fn drop(&mut self) {
        self.release();
    }
}
