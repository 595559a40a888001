//! tessera-carousel: the carousel content block.
//!
//! This crate provides:
//! - `parser` - authored rows into slides, with layout filtering
//! - `layout` - layout variants and their selection
//! - `metadata` - per-item metadata rows and linked-page merging
//! - `media` - media resolution, configuration and lazy loading
//! - `render` - navigation, overlay and region markup
//! - `carousel` - decoration and the [`Carousel`] state
//! - `controller` - event and frame handlers for a decorated carousel
//! - `navigation`, `autoplay`, `scroll`, `gallery`, `crossfade`, `input` -
//!   the behaviour state machines, free of any DOM
//! - `player`, `serializer`, `video_controls` - video player bootstrap and
//!   play/pause controls
//! - `clock`, `teardown` - frame scheduling and resource release
//!
//! The crate never touches a browser. A host imports the block into a
//! [`tessera_common::dom::Dom`], feeds events and animation frames in, and
//! applies the [`Patch`]es, [`Effect`]s and [`BootstrapRequest`]s that come
//! out.

pub mod autoplay;
pub mod carousel;
pub mod clock;
pub mod controller;
pub mod crossfade;
pub mod gallery;
pub mod input;
pub mod layout;
pub mod media;
pub mod metadata;
pub mod navigation;
pub mod parser;
pub mod player;
pub mod render;
pub mod scroll;
pub mod serializer;
pub mod slide;
pub mod teardown;
pub mod video_controls;

pub use crate::carousel::{Carousel, DECORATED_ATTR, DecorateContext, Effect, Environment, FrameInput};
pub use crate::clock::FrameClock;
pub use crate::controller::start_video;
pub use crate::gallery::TrackMetrics;
pub use crate::input::Interaction;
pub use crate::layout::LayoutVariant;
pub use crate::navigation::NavigationAction;
pub use crate::player::{BootstrapRequest, PlayerEvent, PlayerHost, PlayerWait, VideoPlayer};
pub use crate::scroll::ScrollMetrics;
pub use crate::serializer::InitSerializer;
pub use crate::slide::Slide;
pub use crate::teardown::Teardown;
pub use crate::video_controls::{VideoCommand, run_command};
pub use tessera_common::dom::Patch;
