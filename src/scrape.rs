use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "Mozilla/5.0";

/// Amount followed by a currency token, e.g. "1 200,50 грн" or "19.99 USD".
static PRICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)([\d\s,.]+)\s*(UAH|USD|грн|₴|\$)").unwrap());

/// Best-effort fields pulled from a product page. Everything is optional:
/// an unparseable or unreachable page yields the empty record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductData {
    pub title: Option<String>,
    pub price: Option<f64>,
    pub image_url: Option<String>,
    pub description: Option<String>,
}

impl ProductData {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.image_url.is_none()
            && self.description.is_none()
    }
}

/// Fetches and parses product pages. Implementations never fail: any network
/// or markup problem degrades to absent fields, so item create/edit can
/// proceed with whatever the user typed.
#[async_trait::async_trait]
pub trait ProductScraper: Send + Sync {
    async fn scrape(&self, url: &str) -> ProductData;

    /// Download the scraped image, sending the product page as Referer.
    /// Failures here are independent of the page scrape.
    async fn fetch_image(&self, image_url: &str, referer: &str) -> Option<Vec<u8>>;
}

#[derive(Debug, Default)]
pub struct HttpScraper;

impl HttpScraper {
    fn client(&self) -> Option<reqwest::Client> {
        match reqwest::Client::builder().timeout(FETCH_TIMEOUT).build() {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::warn!("Failed to build HTTP client: {e}");
                None
            }
        }
    }
}

#[async_trait::async_trait]
impl ProductScraper for HttpScraper {
    async fn scrape(&self, url: &str) -> ProductData {
        let Some(client) = self.client() else {
            return ProductData::default();
        };

        let resp = match client
            .get(url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .and_then(|r| r.error_for_status())
        {
            Ok(resp) => resp,
            Err(e) => {
                tracing::warn!("Product page fetch failed for {url}: {e}");
                return ProductData::default();
            }
        };

        match resp.text().await {
            Ok(body) => parse_product_page(&body),
            Err(e) => {
                tracing::warn!("Product page body read failed for {url}: {e}");
                ProductData::default()
            }
        }
    }

    async fn fetch_image(&self, image_url: &str, referer: &str) -> Option<Vec<u8>> {
        let client = self.client()?;

        let result = client
            .get(image_url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(reqwest::header::REFERER, referer)
            .send()
            .await
            .and_then(|r| r.error_for_status());

        match result {
            Ok(resp) => match resp.bytes().await {
                Ok(bytes) => Some(bytes.to_vec()),
                Err(e) => {
                    tracing::warn!("Image body read failed for {image_url}: {e}");
                    None
                }
            },
            Err(e) => {
                tracing::warn!("Image download failed for {image_url}: {e}");
                None
            }
        }
    }
}

/// Heuristic extraction over arbitrary third-party markup:
/// - title: first `<h1>`, falling back to a "product-title"-classed element
/// - price: maximum valid candidate among "price"-classed elements (sites
///   often show a crossed-out original next to the discounted price)
/// - image: `<meta property="og:image">` content
/// - description: first "description"-classed element, lines joined with `\n`
pub fn parse_product_page(html: &str) -> ProductData {
    let doc = Html::parse_document(html);

    let h1_sel = Selector::parse("h1").ok();
    let classed_sel = Selector::parse("[class]").ok();
    let og_image_sel = Selector::parse(r#"meta[property="og:image"]"#).ok();

    let title = h1_sel
        .as_ref()
        .and_then(|sel| doc.select(sel).next())
        .map(|el| element_text(&el))
        .filter(|t| !t.is_empty())
        .or_else(|| {
            classed_sel
                .as_ref()
                .and_then(|sel| {
                    doc.select(sel)
                        .find(|el| class_contains(el, "product-title"))
                })
                .map(|el| element_text(&el))
                .filter(|t| !t.is_empty())
        });

    let mut prices = Vec::new();
    if let Some(sel) = classed_sel.as_ref() {
        for el in doc.select(sel).filter(|el| class_contains(el, "price")) {
            if let Some(value) = parse_price_text(&element_text(&el)) {
                prices.push(value);
            }
        }
    }
    let price = prices.into_iter().reduce(f64::max);

    let image_url = og_image_sel
        .as_ref()
        .and_then(|sel| doc.select(sel).next())
        .and_then(|el| el.value().attr("content"))
        .map(str::to_string)
        .filter(|u| !u.is_empty());

    let description = classed_sel
        .as_ref()
        .and_then(|sel| {
            doc.select(sel)
                .find(|el| class_contains(el, "description"))
        })
        .map(|el| element_lines(&el))
        .filter(|d| !d.is_empty());

    ProductData {
        title,
        price,
        image_url,
        description,
    }
}

/// Pull a positive price out of free-form text like
/// "Price: 1 200,50 грн". Spaces are thousands separators, comma is a
/// decimal point. Returns None for unparseable or non-positive values.
pub fn parse_price_text(text: &str) -> Option<f64> {
    let caps = PRICE_RE.captures(text)?;
    let normalized = caps[1].replace(' ', "").replace(',', ".");
    normalized
        .parse::<f64>()
        .ok()
        .filter(|value| *value > 0.0)
}

fn class_contains(el: &ElementRef<'_>, needle: &str) -> bool {
    el.value()
        .attr("class")
        .is_some_and(|class| class.to_lowercase().contains(needle))
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("")
}

fn element_lines(el: &ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}
