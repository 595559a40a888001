//! Video player bootstrap.
//!
//! The player library is a page-global script. [`PlayerHost`] is the
//! capability the carousel talks to; the browser crate implements it over
//! `window.bc` / `window.videojs`, tests with a recording fake.
//!
//! A bootstrap embeds the player, nudges the library until it initialises the
//! element, then waits for a player handle. When the library is already on the
//! page the whole sequence runs inside the page's [`InitSerializer`], so two
//! carousels never initialise at the same time.

use std::rc::Rc;

use n0_future::future::zip;
use tessera_common::config::CarouselSettings;
use tessera_common::error::PlayerError;

use crate::clock::FrameClock;
use crate::serializer::InitSerializer;
use crate::teardown::Teardown;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Play,
    Pause,
}

impl PlayerEvent {
    pub fn as_str(self) -> &'static str {
        match self {
            PlayerEvent::Play => "play",
            PlayerEvent::Pause => "pause",
        }
    }
}

/// A live player handle.
pub trait VideoPlayer {
    fn play(&self) -> Result<(), PlayerError>;
    fn pause(&self) -> Result<(), PlayerError>;
    fn paused(&self) -> Result<bool, PlayerError>;
    /// Subscribe to `event`. The returned teardown unsubscribes.
    fn on(&self, event: PlayerEvent, handler: Box<dyn FnMut()>) -> Teardown;
}

/// The page's player library.
pub trait PlayerHost {
    type Player: VideoPlayer + 'static;

    /// Library globals are present.
    fn is_ready(&self) -> bool;
    /// The loader script for `script_url` finished loading earlier, or the
    /// library is already present.
    fn script_loaded(&self, script_url: Option<&str>) -> bool;
    /// Another player element younger than `grace_ms` is still waiting for
    /// initialisation.
    fn has_pending_peers(&self, except_id: &str, grace_ms: f64) -> bool;
    fn load_embed(&self, request: &BootstrapRequest) -> Result<(), PlayerError>;
    fn is_initialized(&self, id: &str) -> bool;
    fn init_player(&self, id: &str) -> Result<(), PlayerError>;
    fn get_player(&self, id: &str) -> Option<Self::Player>;
    /// Apply `label` to the player element and any iframe it injected.
    /// Returns `true` once an iframe was found and labelled.
    fn apply_label(&self, id: &str, label: &str) -> bool;
}

impl<H: PlayerHost> PlayerHost for Rc<H> {
    type Player = H::Player;

    fn is_ready(&self) -> bool {
        (**self).is_ready()
    }

    fn script_loaded(&self, script_url: Option<&str>) -> bool {
        (**self).script_loaded(script_url)
    }

    fn has_pending_peers(&self, except_id: &str, grace_ms: f64) -> bool {
        (**self).has_pending_peers(except_id, grace_ms)
    }

    fn load_embed(&self, request: &BootstrapRequest) -> Result<(), PlayerError> {
        (**self).load_embed(request)
    }

    fn is_initialized(&self, id: &str) -> bool {
        (**self).is_initialized(id)
    }

    fn init_player(&self, id: &str) -> Result<(), PlayerError> {
        (**self).init_player(id)
    }

    fn get_player(&self, id: &str) -> Option<Self::Player> {
        (**self).get_player(id)
    }

    fn apply_label(&self, id: &str, label: &str) -> bool {
        (**self).apply_label(id, label)
    }
}

/// Everything a bootstrap needs, captured when a video slide loads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapRequest {
    pub carousel_id: String,
    pub slide_index: usize,
    pub video_id: String,
    pub account: Option<String>,
    pub player: Option<String>,
    pub embed: String,
    pub label: Option<String>,
}

impl BootstrapRequest {
    /// `https://players.brightcove.net/{account}/{player}_{embed}/index.min.js`
    pub fn script_url(&self) -> Result<String, PlayerError> {
        let account = self
            .account
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(PlayerError::MissingAttribute("data-account"))?;
        let player = self
            .player
            .as_deref()
            .filter(|s| !s.is_empty())
            .ok_or(PlayerError::MissingAttribute("data-player"))?;
        let embed = if self.embed.is_empty() {
            "default"
        } else {
            &self.embed
        };
        Ok(format!(
            "https://players.brightcove.net/{account}/{player}_{embed}/index.min.js"
        ))
    }
}

/// Outcome of waiting for a player handle.
#[derive(Debug)]
pub enum PlayerWait<P> {
    Found(P),
    TimedOut,
}

impl<P> PlayerWait<P> {
    pub fn found(self) -> Option<P> {
        match self {
            PlayerWait::Found(p) => Some(p),
            PlayerWait::TimedOut => None,
        }
    }
}

/// Wait until the library globals exist and no younger peer is still
/// uninitialised, then let the page settle. `false` when the budget ran out.
pub async fn wait_for_library_ready<H, C>(
    host: &H,
    clock: &C,
    video_id: &str,
    settings: &CarouselSettings,
) -> bool
where
    H: PlayerHost,
    C: FrameClock,
{
    let start = clock.now();
    loop {
        let now = clock.next_frame().await;
        if now - start > settings.player_ready_timeout_ms {
            tracing::warn!(video_id, "player library not ready, continuing anyway");
            return false;
        }
        if host.is_ready() && !host.has_pending_peers(video_id, settings.player_pending_grace_ms) {
            clock.frames(settings.player_settle_frames).await;
            return true;
        }
    }
}

/// Ask the library to initialise `video_id` until it takes, a few frames
/// apart.
pub async fn init_with_retries<H, C>(
    host: &H,
    clock: &C,
    video_id: &str,
    settings: &CarouselSettings,
) -> Result<(), PlayerError>
where
    H: PlayerHost,
    C: FrameClock,
{
    if !host.is_ready() {
        return Err(PlayerError::LibraryMissing);
    }
    let attempts = settings.player_init_attempts;
    for attempt in 0..attempts {
        clock.frames(if attempt == 0 { 3 } else { 5 }).await;
        if host.is_initialized(video_id) || host.get_player(video_id).is_some() {
            return Ok(());
        }
        if let Err(error) = host.init_player(video_id) {
            tracing::debug!(video_id, attempt, %error, "player init attempt failed");
        }
    }
    if host.is_initialized(video_id) {
        Ok(())
    } else {
        Err(PlayerError::InitFailed {
            id: video_id.to_owned(),
            attempts,
        })
    }
}

/// Poll for the player handle with exponential backoff.
pub async fn wait_for_player<H, C>(
    host: &H,
    clock: &C,
    video_id: &str,
    settings: &CarouselSettings,
) -> PlayerWait<H::Player>
where
    H: PlayerHost,
    C: FrameClock,
{
    let start = clock.now();
    let mut delay = settings.player_wait_initial_ms;
    while clock.now() - start < settings.player_wait_budget_ms {
        if host.is_ready()
            && let Some(player) = host.get_player(video_id)
        {
            return PlayerWait::Found(player);
        }
        clock.sleep(delay).await;
        delay = (delay * 2.0).min(settings.player_wait_max_ms);
    }
    tracing::warn!(video_id, "player never became available");
    PlayerWait::TimedOut
}

/// Re-apply the media label each frame until the player's iframe shows up
/// or the frame budget runs out.
pub async fn watch_media_label<H, C>(host: &H, clock: &C, video_id: &str, label: &str, frames: u32)
where
    H: PlayerHost,
    C: FrameClock,
{
    for _ in 0..frames {
        clock.next_frame().await;
        if host.apply_label(video_id, label) {
            tracing::trace!(video_id, "media label applied to player iframe");
            return;
        }
    }
}

async fn embed_and_wait<H, C>(
    host: &H,
    clock: &C,
    request: &BootstrapRequest,
    settings: &CarouselSettings,
    retry_init: bool,
) -> PlayerWait<H::Player>
where
    H: PlayerHost,
    C: FrameClock,
{
    if let Err(error) = host.load_embed(request) {
        tracing::warn!(video_id = %request.video_id, %error, "could not embed player");
    }
    if !retry_init {
        return wait_for_player(host, clock, &request.video_id, settings).await;
    }
    let (init, wait) = zip(
        init_with_retries(host, clock, &request.video_id, settings),
        wait_for_player(host, clock, &request.video_id, settings),
    )
    .await;
    if let Err(error) = init {
        tracing::debug!(video_id = %request.video_id, %error, "player init gave up");
    }
    wait
}

/// Bootstrap the player for `request`.
///
/// Runs inside `serializer` when the library is already loaded, directly
/// otherwise. The label watch runs after the player handle is known.
pub async fn bootstrap_player<H, C>(
    host: &H,
    clock: &C,
    serializer: &InitSerializer,
    request: &BootstrapRequest,
    settings: &CarouselSettings,
) -> PlayerWait<H::Player>
where
    H: PlayerHost,
    C: FrameClock,
{
    let script_url = match request.script_url() {
        Ok(url) => Some(url),
        Err(error) => {
            tracing::warn!(video_id = %request.video_id, %error, "invalid player script");
            None
        }
    };
    if let Some(label) = request.label.as_deref() {
        host.apply_label(&request.video_id, label);
    }

    let wait = if host.script_loaded(script_url.as_deref()) {
        tracing::debug!(video_id = %request.video_id, "player library present, queueing bootstrap");
        serializer
            .enqueue(clock, || async {
                wait_for_library_ready(host, clock, &request.video_id, settings).await;
                embed_and_wait(host, clock, request, settings, true).await
            })
            .await
    } else {
        tracing::debug!(video_id = %request.video_id, "first player on the page, bootstrapping directly");
        embed_and_wait(host, clock, request, settings, false).await
    };

    if let Some(label) = request.label.as_deref() {
        watch_media_label(
            host,
            clock,
            &request.video_id,
            label,
            settings.alt_text_watch_frames,
        )
        .await;
    }
    wait
}
