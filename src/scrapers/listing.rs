//! Field extraction from a rendered listing page
//!
//! Listings come in several templates, so every field has a prioritized
//! list of selectors; the first one that yields non-empty text wins.

use crate::address::parse_address;
use crate::models::{Characteristics, ListingRecord};
use crate::scrapers::types::ExtractOptions;
use chrono::Local;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Structural markers that signal a listing page has rendered
pub const READY_SELECTORS: &[&str] = &[
    "div.details",
    "main",
    "div[data-testid='ad-detail']",
    "section[data-testid='listing-details']",
];

const ADVERTISER: &[&str] = &[
    "a[data-testid='official-store-redirect-link']",
    "[data-testid='advertiser-info-header'] h2",
    "section.advertiser-info .advertiser-info__name",
];

const TRANSACTION_TYPE: &[&str] = &[
    "div.price-info__values-sale div.value-item:nth-of-type(1) .value-item__title",
    "div.price-info__values-both div.value-item:nth-of-type(1) .value-item__title",
    "div.value-item:nth-of-type(1) > p.value-item__title",
];

const PRICE: &[&str] = &[
    "div.value-item:nth-of-type(1) > p.value-item__value",
    "[data-testid='price-value']",
    "h3.price__price-info",
];

const ADDRESS: &[&str] = &[
    "p.location-address__text[data-testid='location-address']",
    "[data-testid='location-address']",
    "p.title__address",
];

const CONDO_FEE: &[&str] = &["[data-testid='condoFee']", "span.price__list-value.condominium"];

const PROPERTY_TAX: &[&str] = &["[data-testid='iptu']", "span.price__list-value.iptu"];

const CHARACTERISTICS: &[&str] = &[
    ".amenities-item-text",
    "[data-testid='amenities-list'] li",
    "ul.features li",
];

const MAP_IFRAME: &[&str] = &["iframe[data-testid='map-iframe']", "iframe[src*='maps']"];

const IMAGES: &[&str] = &[
    ".olx-core-carousel__container img",
    "ul.carousel-photos--wrapper img",
    "img[property='image']",
    "img[src*='resizedimgs.vivareal']",
];

const AREA_KEYWORDS: &[&str] = &["m²", "m2"];
const BEDROOM_KEYWORDS: &[&str] = &["quarto"];
const BATHROOM_KEYWORDS: &[&str] = &["banheiro"];
const SUITE_KEYWORDS: &[&str] = &["suíte", "suite"];
const PARKING_KEYWORDS: &[&str] = &["vaga"];

/// Builds a record from a listing page's markup
///
/// Never fails: fields that cannot be found are left absent. Callers decide
/// whether the result is usable with [`ListingRecord::is_meaningful`].
pub fn parse_listing(html: &str, link: &str, options: &ExtractOptions) -> ListingRecord {
    let document = Html::parse_document(html);

    let address = first_text(&document, ADDRESS);
    let address_parts = address.as_deref().map(parse_address).unwrap_or_default();

    let (latitude, longitude) = if options.coordinates {
        first_attr(&document, MAP_IFRAME, "src")
            .and_then(|src| coordinates_from_map_src(&src))
            .map_or((None, None), |(lat, lng)| (Some(lat), Some(lng)))
    } else {
        (None, None)
    };

    let mut images = image_urls(&document);
    if let Some(max) = options.max_images {
        images.truncate(max);
    }

    ListingRecord {
        advertiser: first_text(&document, ADVERTISER),
        transaction_type: first_text(&document, TRANSACTION_TYPE),
        price: first_text(&document, PRICE),
        address,
        address_parts,
        characteristics: classify_characteristics(characteristic_texts(&document)),
        latitude,
        longitude,
        condo_fee: first_text(&document, CONDO_FEE),
        property_tax: first_text(&document, PROPERTY_TAX),
        images,
        extracted_at: Local::now(),
        link: link.to_string(),
    }
}

/// Sorts characteristic tags into slots by keyword
///
/// Each slot takes the first tag containing one of its keywords
/// (case-insensitive). Tags equal to a claimed value are left out of
/// `others`.
pub fn classify_characteristics(all: Vec<String>) -> Characteristics {
    let lower: Vec<String> = all.iter().map(|c| c.to_lowercase()).collect();
    let find = |keywords: &[&str]| {
        lower
            .iter()
            .position(|c| keywords.iter().any(|k| c.contains(k)))
            .map(|idx| all[idx].clone())
    };

    let area = find(AREA_KEYWORDS);
    let bedrooms = find(BEDROOM_KEYWORDS);
    let bathrooms = find(BATHROOM_KEYWORDS);
    let suites = find(SUITE_KEYWORDS);
    let parking = find(PARKING_KEYWORDS);

    let claimed = [&area, &bedrooms, &bathrooms, &suites, &parking];
    let others = all
        .iter()
        .filter(|c| !claimed.iter().any(|slot| slot.as_deref() == Some(c.as_str())))
        .cloned()
        .collect();

    Characteristics {
        area,
        bedrooms,
        bathrooms,
        suites,
        parking,
        others,
        all,
    }
}

/// Reads `q=<lat>,<lng>` from an embedded map URL
pub fn coordinates_from_map_src(src: &str) -> Option<(String, String)> {
    let value = match Url::parse(src) {
        Ok(url) => url
            .query_pairs()
            .filter(|(key, _)| key == "q")
            .last()
            .map(|(_, v)| v.into_owned())?,
        Err(_) => {
            let raw = src.rsplit_once("q=")?.1;
            let raw = raw.split('&').next()?;
            url::form_urlencoded::parse(format!("q={raw}").as_bytes())
                .next()
                .map(|(_, v)| v.into_owned())?
        }
    };
    let (lat, lng) = value.split_once(',')?;
    let (lat, lng) = (lat.trim(), lng.trim());
    if lat.is_empty() || lng.is_empty() {
        return None;
    }
    Some((lat.to_string(), lng.to_string()))
}

fn characteristic_texts(document: &Html) -> Vec<String> {
    for css in CHARACTERISTICS {
        let Some(selector) = selector(css) else {
            continue;
        };
        let texts: Vec<String> = document
            .select(&selector)
            .map(element_text)
            .filter(|t| !t.is_empty())
            .collect();
        if !texts.is_empty() {
            return texts;
        }
    }
    Vec::new()
}

/// Collects gallery image URLs, skipping placeholders and icons
fn image_urls(document: &Html) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();

    for css in IMAGES {
        let Some(selector) = selector(css) else {
            continue;
        };
        for img in document.select(&selector) {
            let attrs = img.value();
            let candidate = attrs
                .attr("srcset")
                .and_then(first_srcset_entry)
                .or_else(|| attrs.attr("src").map(str::trim))
                .or_else(|| attrs.attr("data-src").map(str::trim))
                .filter(|u| !u.is_empty());

            if let Some(url) = candidate {
                if !is_placeholder_image(url) && !urls.iter().any(|u| u == url) {
                    urls.push(url.to_string());
                }
            }
        }
    }

    urls
}

fn first_srcset_entry(srcset: &str) -> Option<&str> {
    srcset
        .split(',')
        .next()
        .and_then(|entry| entry.split_whitespace().next())
}

fn is_placeholder_image(url: &str) -> bool {
    let lower = url.to_lowercase();
    url.contains("{description}")
        || lower.starts_with("data:")
        || lower.ends_with(".svg")
        || lower.contains("/icons/")
        || lower.contains("placeholder")
}

fn first_text(document: &Html, candidates: &[&str]) -> Option<String> {
    candidates.iter().find_map(|css| {
        let selector = selector(css)?;
        document
            .select(&selector)
            .map(element_text)
            .find(|t| !t.is_empty())
    })
}

fn first_attr(document: &Html, candidates: &[&str], attr: &str) -> Option<String> {
    candidates.iter().find_map(|css| {
        let selector = selector(css)?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr(attr))
            .map(str::trim)
            .find(|v| !v.is_empty())
            .map(str::to_string)
    })
}

/// Visible text with whitespace runs collapsed
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn selector(css: &str) -> Option<Selector> {
    match Selector::parse(css) {
        Ok(selector) => Some(selector),
        Err(e) => {
            tracing::warn!("Invalid selector {}: {:?}", css, e);
            None
        }
    }
}

/// Resolves `href` against the page URL, dropping any fragment
pub(crate) fn absolutize(page_url: &Url, href: &str) -> Option<String> {
    let mut url = page_url.join(href.trim()).ok()?;
    url.set_fragment(None);
    Some(url.into())
}
