//! Search result URL composition

use crate::scrapers::types::SORT_PARAM;
use crate::{Result, ScrapeError};
use url::Url;

const PAGE_PARAM: &str = "page";

/// Builds the URL of result page `page` for a search base URL
///
/// Any sort and page parameters already present in `base_url` are dropped;
/// `sort_suffix` (e.g. `ordem=MOST_RECENT`) is appended when given and the
/// page parameter always comes last. Other parameters keep their order.
///
/// # Examples
///
/// ```
/// use listing_crawler::scrapers::build_page_url;
///
/// let url = build_page_url(
///     "https://www.vivareal.com.br/venda/sp/sao-paulo/?tipos=apartamento_residencial&ordem=X",
///     3,
///     Some("ordem=MOST_RECENT"),
/// )
/// .unwrap();
/// assert_eq!(
///     url,
///     "https://www.vivareal.com.br/venda/sp/sao-paulo/?tipos=apartamento_residencial&ordem=MOST_RECENT&page=3"
/// );
/// ```
pub fn build_page_url(base_url: &str, page: u32, sort_suffix: Option<&str>) -> Result<String> {
    let mut url = Url::parse(base_url).map_err(|source| ScrapeError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })?;

    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != SORT_PARAM && key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    let sort_pairs: Vec<(String, String)> = sort_suffix
        .map(|suffix| {
            url::form_urlencoded::parse(suffix.trim_start_matches(['?', '&']).as_bytes())
                .filter(|(key, _)| key == SORT_PARAM)
                .take(1)
                .map(|(key, value)| (key.into_owned(), value.into_owned()))
                .collect()
        })
        .unwrap_or_default();

    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in kept.iter().chain(sort_pairs.iter()) {
            query.append_pair(key, value);
        }
        query.append_pair(PAGE_PARAM, &page.to_string());
    }

    Ok(url.into())
}
