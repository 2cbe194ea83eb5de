// Preview binding
//
// Binds a live feed for the selected source to the preview surface and keeps
// it for the mixer. Each bind takes a generation number when issued; a bind
// that resolves after a newer one was issued is discarded.

use log::{debug, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::error::{CaptureError, Result};
use crate::host::{CaptureHost, PreviewSurface};
use crate::media::MediaFeed;
use crate::source::{find_source, CaptureSource};

#[derive(Debug, Clone)]
pub struct BoundPreview {
    pub source: CaptureSource,
    pub feed: MediaFeed,
    pub generation: u64,
}

#[derive(Debug, Clone)]
pub enum BindOutcome {
    Bound {
        source: CaptureSource,
        /// Whether a previously held feed was released by this bind.
        released_prior: bool,
    },
    /// A newer bind was issued while this one was resolving.
    Superseded,
}

impl BindOutcome {
    pub fn is_bound(&self) -> bool {
        matches!(self, BindOutcome::Bound { .. })
    }
}

pub struct PreviewBinder<S: PreviewSurface> {
    surface: S,
    generation: AtomicU64,
    current: Mutex<Option<BoundPreview>>,
}

impl<S: PreviewSurface> PreviewBinder<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            generation: AtomicU64::new(0),
            current: Mutex::new(None),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    fn slot(&self) -> MutexGuard<'_, Option<BoundPreview>> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_latest(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    /// Bind a preview for `source_id`, re-listing sources to resolve it.
    pub async fn bind<H: CaptureHost>(
        &self,
        host: &H,
        source_id: &str,
        system_audio: bool,
    ) -> Result<BindOutcome> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        debug!("Binding preview for {} (generation {})", source_id, generation);

        let sources = host.list_sources().await?;
        let source = find_source(&sources, source_id)
            .cloned()
            .ok_or_else(|| CaptureError::SourceNotFound(source_id.to_string()))?;

        // Release before acquiring, unless a newer bind already owns the slot.
        let mut released_prior = false;
        if self.is_latest(generation) {
            released_prior = self.release_held();
        }

        let mut feed = match host.acquire_video(&source).await {
            Ok(feed) => feed,
            Err(e) => {
                // The surface still shows the feed released above.
                if released_prior && self.is_latest(generation) {
                    self.surface.detach();
                }
                return Err(e);
            }
        };
        if system_audio {
            match host.acquire_system_audio(&source).await {
                Ok(audio) => feed.extend(audio),
                Err(e) => warn!("⚠️  Preview continues without system audio: {}", e),
            }
        }

        let mut current = self.slot();
        if !self.is_latest(generation) {
            debug!("Discarding stale preview for {} (generation {})", source_id, generation);
            feed.stop();
            return Ok(BindOutcome::Superseded);
        }

        if let Some(previous) = current.take() {
            previous.feed.stop();
            released_prior = true;
        }

        self.surface.attach(&source, &feed);
        info!("🖥️  Preview bound to {} ({} tracks)", source.name, feed.len());
        *current = Some(BoundPreview {
            source: source.clone(),
            feed,
            generation,
        });

        Ok(BindOutcome::Bound {
            source,
            released_prior,
        })
    }

    fn release_held(&self) -> bool {
        match self.slot().take() {
            Some(previous) => {
                let stopped = previous.feed.stop();
                debug!("Released preview of {} ({} live tracks stopped)", previous.source.id, stopped);
                true
            }
            None => false,
        }
    }

    /// Stop the held feed and clear the surface. Pending binds become stale.
    pub fn release(&self) -> bool {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let released = self.release_held();
        if released {
            self.surface.detach();
        }
        released
    }

    pub fn feed(&self) -> Option<MediaFeed> {
        self.slot().as_ref().map(|bound| bound.feed.clone())
    }

    pub fn source(&self) -> Option<CaptureSource> {
        self.slot().as_ref().map(|bound| bound.source.clone())
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }
}
