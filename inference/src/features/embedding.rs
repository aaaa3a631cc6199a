//! Fixed-shape sequence embedding.
//!
//! Reserved for future model upgrades; current scoring does not read it.
//! Dimension count and ordering are a stable contract:
//!
//! | idx | meaning |
//! |---|---|
//! | 0 | `click` count |
//! | 1 | `page_view` count |
//! | 2 | `form_submit` count |
//! | 3 | `scroll` count |
//! | 4 | pricing URL hits |
//! | 5 | product URL hits |
//! | 6 | help URL hits |

use crate::events::Event;
use crate::features::extractor::{classify_url, UrlCategory};

pub const SEQ_EMBEDDING_DIM: usize = 7;

const TYPE_SLOTS: [&str; 4] = ["click", "page_view", "form_submit", "scroll"];

pub fn make_seq_embedding(events: &[Event]) -> [f64; SEQ_EMBEDDING_DIM] {
    let mut v = [0.0; SEQ_EMBEDDING_DIM];
    for event in events {
        if let Some(slot) = TYPE_SLOTS.iter().position(|t| *t == event.event_type) {
            v[slot] += 1.0;
        }
        match event.url().and_then(classify_url) {
            Some(UrlCategory::Pricing) => v[4] += 1.0,
            Some(UrlCategory::Product) => v[5] += 1.0,
            Some(UrlCategory::Help) => v[6] += 1.0,
            None => {}
        }
    }
    v
}
