//! Services shared by every carousel on the page.

use std::cell::RefCell;
use std::rc::Rc;

use tessera_carousel::InitSerializer;
use tessera_common::analytics::InteractionTracker;
use tessera_common::config::{CarouselSettings, JsonSource};
use tessera_common::ids::IdGenerator;
use tessera_common::metadata::HttpMetadataFetcher;
use tessera_common::placeholders::HttpPlaceholders;
use web_sys::{Document, Window};

use crate::clock::RafClock;
use crate::player::BrightcoveHost;
use crate::tracker::DataLayerTracker;

/// `<script type="application/json" id="tessera-carousel-settings">`
pub const SETTINGS_SCRIPT_ID: &str = "tessera-carousel-settings";

thread_local! {
    static PAGE: RefCell<Option<Rc<Page>>> = const { RefCell::new(None) };
}

pub struct Page {
    pub window: Window,
    pub document: Document,
    pub settings: CarouselSettings,
    pub ids: IdGenerator,
    pub serializer: Rc<InitSerializer>,
    pub placeholders: HttpPlaceholders,
    pub metadata: HttpMetadataFetcher,
    pub players: Rc<BrightcoveHost>,
    pub clock: Rc<RafClock>,
    pub tracker: Rc<dyn InteractionTracker>,
}

impl Page {
    /// The page's services, created on first use.
    pub async fn shared() -> Option<Rc<Page>> {
        if let Some(page) = PAGE.with(|p| p.borrow().clone()) {
            return Some(page);
        }
        let window = web_sys::window()?;
        let document = window.document()?;
        let settings = load_settings(&document).await;
        let page = Rc::new(Page::new(window, document, settings));
        // another decoration may have won the race while settings loaded
        Some(PAGE.with(|p| p.borrow_mut().get_or_insert(page).clone()))
    }

    fn new(window: Window, document: Document, settings: CarouselSettings) -> Self {
        let location = window.location();
        let origin = location.origin().unwrap_or_default();
        let href = location.href().ok();
        Self {
            ids: IdGenerator::from_clock(),
            serializer: Rc::new(InitSerializer::new(settings.settle_frames)),
            placeholders: HttpPlaceholders::new(&origin, &settings.placeholder_prefix),
            metadata: HttpMetadataFetcher::new(href.as_deref()),
            players: Rc::new(BrightcoveHost::new(window.clone(), document.clone())),
            clock: Rc::new(RafClock),
            tracker: Rc::new(DataLayerTracker::new()),
            settings,
            window,
            document,
        }
    }

    pub fn origin(&self) -> String {
        self.window.location().origin().unwrap_or_default()
    }
}

async fn load_settings(document: &Document) -> CarouselSettings {
    match document
        .get_element_by_id(SETTINGS_SCRIPT_ID)
        .and_then(|script| script.text_content())
    {
        Some(json) => CarouselSettings::load_or_default(&JsonSource::new(json)).await,
        None => CarouselSettings::default(),
    }
}
