//! Heuristic product extraction.
//!
//! A page is scanned with a priority list of "item container" selectors. The
//! first selector that matches several containers (and yields at least one
//! product) wins; a selector matching a single container is only used when no
//! selector matched more than once. Inside a container, name, price, image and
//! link come from further selector lists.

use once_cell::sync::Lazy;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::debug;
use url::Url;

use crate::config::ExtractorConfig;
use crate::error::ExtractorError;
use crate::models::{Price, Product};
use crate::parsers::{clean_text, extract_price, truncate_chars};

pub const MAX_NAME_CHARS: usize = 100;

const NAME_SELECTORS: &[&str] = &[
    "h1",
    "h2",
    "h3",
    "h4",
    ".title",
    ".name",
    ".product-name",
    ".product-title",
    r#"[class*="title"]"#,
    r#"[class*="name"]"#,
];

const PRICE_SELECTORS: &[&str] = &[
    r#"[itemprop="price"]"#,
    ".price",
    ".cost",
    r#"[class*="price"]"#,
    r#"[class*="cost"]"#,
];

const IMAGE_ATTRS: &[&str] = &["src", "data-src", "data-lazy-src", "data-original"];

static NAME_SELECTOR_LIST: Lazy<Vec<Selector>> = Lazy::new(|| compile(NAME_SELECTORS));
static PRICE_SELECTOR_LIST: Lazy<Vec<Selector>> = Lazy::new(|| compile(PRICE_SELECTORS));
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("img").expect("Invalid img selector"));
static LINK_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

fn compile(list: &[&str]) -> Vec<Selector> {
    list.iter()
        .map(|css| Selector::parse(css).expect("Invalid built-in selector"))
        .collect()
}

struct ContainerSelector {
    css: String,
    selector: Selector,
}

/// Products found on one page and the container selector that produced them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub products: Vec<Product>,
    pub selector: Option<String>,
}

pub struct ProductExtractor {
    containers: Vec<ContainerSelector>,
    max_items: usize,
}

impl Default for ProductExtractor {
    fn default() -> Self {
        Self::new(&ExtractorConfig::default()).expect("Invalid default container selectors")
    }
}

impl ProductExtractor {
    pub fn new(config: &ExtractorConfig) -> Result<Self, ExtractorError> {
        let containers = config
            .container_selectors
            .iter()
            .map(|css| {
                Selector::parse(css)
                    .map(|selector| ContainerSelector {
                        css: css.clone(),
                        selector,
                    })
                    .map_err(|e| ExtractorError::InvalidSelector {
                        selector: css.clone(),
                        reason: format!("{:?}", e),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            containers,
            max_items: config.max_items,
        })
    }

    pub fn extract(&self, html: &str, base_url: &Url) -> Extraction {
        let document = Html::parse_document(html);
        let mut single_match: Option<Extraction> = None;

        for container in &self.containers {
            let items: Vec<ElementRef> = document.select(&container.selector).collect();
            if items.is_empty() {
                continue;
            }

            let products = self.extract_items(&items, base_url);
            debug!(
                selector = %container.css,
                matches = items.len(),
                products = products.len(),
                "Tried container selector"
            );

            if products.is_empty() {
                continue;
            }

            let extraction = Extraction {
                products,
                selector: Some(container.css.clone()),
            };

            if items.len() > 1 {
                return extraction;
            }

            if single_match.is_none() {
                single_match = Some(extraction);
            }
        }

        single_match.unwrap_or_default()
    }

    /// How many elements each container selector matches, in priority order.
    pub fn container_matches(&self, html: &str) -> Vec<(String, usize)> {
        let document = Html::parse_document(html);
        self.containers
            .iter()
            .map(|c| (c.css.clone(), document.select(&c.selector).count()))
            .collect()
    }

    fn extract_items(&self, items: &[ElementRef], base_url: &Url) -> Vec<Product> {
        let mut seen = HashSet::new();

        items
            .iter()
            .take(self.max_items)
            .filter_map(|item| extract_product(*item, base_url))
            .filter(|product| seen.insert(product.id()))
            .collect()
    }
}

/// Name and price are required; image and link are optional.
pub fn extract_product(item: ElementRef, base_url: &Url) -> Option<Product> {
    let name = extract_name(item)?;
    let price = extract_item_price(item)?;

    Some(Product {
        name: truncate_chars(&name, MAX_NAME_CHARS),
        price: Price(price),
        image_url: extract_image(item, base_url),
        link_url: extract_link(item, base_url),
    })
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn element_text(element: ElementRef) -> String {
    clean_text(&element.text().collect::<String>())
}

fn extract_name(item: ElementRef) -> Option<String> {
    for selector in NAME_SELECTOR_LIST.iter() {
        if let Some(name) = item.select(selector).next().map(element_text).and_then(non_empty) {
            return Some(name);
        }
    }

    // Cards that only carry the name as link title or image alt text
    item.select(&LINK_SELECTOR)
        .find_map(|a| a.value().attr("title").map(clean_text).and_then(non_empty))
        .or_else(|| {
            item.select(&IMG_SELECTOR)
                .find_map(|img| img.value().attr("alt").map(clean_text).and_then(non_empty))
        })
}

fn extract_item_price(item: ElementRef) -> Option<String> {
    for selector in PRICE_SELECTOR_LIST.iter() {
        if let Some(element) = item.select(selector).next() {
            let from_content = element.value().attr("content").and_then(extract_price);
            if let Some(price) = from_content.or_else(|| extract_price(&element_text(element))) {
                return Some(price);
            }
        }
    }
    None
}

fn resolve(base_url: &Url, raw: &str) -> Option<String> {
    let joined = base_url.join(raw.trim()).ok()?;
    match joined.scheme() {
        "http" | "https" => Some(joined.to_string()),
        _ => None,
    }
}

fn extract_image(item: ElementRef, base_url: &Url) -> Option<String> {
    let img = item.select(&IMG_SELECTOR).next()?;

    IMAGE_ATTRS
        .iter()
        .filter_map(|attr| img.value().attr(attr))
        .map(str::trim)
        .find(|src| !src.is_empty() && !src.starts_with("data:"))
        .and_then(|src| resolve(base_url, src))
}

fn usable_href(href: &str) -> bool {
    let href = href.trim();
    let lower = href.to_lowercase();
    !href.is_empty()
        && !href.starts_with('#')
        && !lower.starts_with("javascript:")
        && !lower.starts_with("mailto:")
        && !lower.starts_with("tel:")
}

fn extract_link(item: ElementRef, base_url: &Url) -> Option<String> {
    // The container itself may be the anchor
    let own_href = if item.value().name() == "a" {
        item.value().attr("href").filter(|h| usable_href(h))
    } else {
        None
    };

    own_href
        .or_else(|| {
            item.select(&LINK_SELECTOR)
                .filter_map(|a| a.value().attr("href"))
                .find(|h| usable_href(h))
        })
        .and_then(|href| resolve(base_url, href))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn base() -> Url {
        Url::parse("https://shop.example.ge/catalog/").unwrap()
    }

    const LISTING: &str = r#"
        <html><body>
          <div class="header"><h1>Our Shop</h1></div>
          <div class="product">
            <a href="/p/kettle"><img src="/img/kettle.jpg" alt="Kettle"></a>
            <h3 class="product-title">  Electric   Kettle </h3>
            <span class="price">1,299.00 ₾</span>
          </div>
          <div class="product">
            <a href="toaster">link</a>
            <img data-src="https://cdn.example.ge/toaster.png">
            <h3>Toaster</h3>
            <div class="price-box"><span class="price">89 ₾</span></div>
          </div>
          <div class="product">
            <h3>Mystery box</h3>
            <span class="price">Call us</span>
          </div>
        </body></html>
    "#;

    #[test]
    fn extracts_products_from_repeated_containers() {
        let extraction = ProductExtractor::default().extract(LISTING, &base());

        assert_eq!(extraction.selector.as_deref(), Some(".product"));
        assert_eq!(
            extraction.products,
            vec![
                Product {
                    name: "Electric Kettle".to_string(),
                    price: Price::new("1299.00"),
                    image_url: Some("https://shop.example.ge/img/kettle.jpg".to_string()),
                    link_url: Some("https://shop.example.ge/p/kettle".to_string()),
                },
                Product {
                    name: "Toaster".to_string(),
                    price: Price::new("89"),
                    image_url: Some("https://cdn.example.ge/toaster.png".to_string()),
                    link_url: Some("https://shop.example.ge/catalog/toaster".to_string()),
                },
            ]
        );
    }

    #[test]
    fn falls_through_to_broader_selectors() {
        let html = r#"
            <ul>
              <li class="catalog-item"><h2>Chair</h2><b class="item-price">40</b></li>
              <li class="catalog-item"><h2>Table</h2><b class="item-price">120</b></li>
            </ul>
        "#;
        let extraction = ProductExtractor::default().extract(html, &base());

        assert_eq!(extraction.selector.as_deref(), Some(r#"[class*="item"]"#));
        let names: Vec<&str> = extraction.products.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Chair", "Table"]);
    }

    #[test]
    fn repeated_match_beats_earlier_single_match() {
        let html = r#"
            <div class="product"><h1>Featured Lamp</h1><span class="price">300</span></div>
            <div class="product-card"><h2>Sofa</h2><span class="price">900</span></div>
            <div class="product-card"><h2>Rug</h2><span class="price">150</span></div>
        "#;
        let extraction = ProductExtractor::default().extract(html, &base());

        assert_eq!(extraction.selector.as_deref(), Some(".product-card"));
        assert_eq!(extraction.products.len(), 2);
    }

    #[test]
    fn single_product_page_is_accepted() {
        let html = r#"
            <div class="product"><h1>Only Lamp</h1><span class="price">300</span></div>
        "#;
        let extraction = ProductExtractor::default().extract(html, &base());

        assert_eq!(extraction.selector.as_deref(), Some(".product"));
        assert_eq!(extraction.products.len(), 1);
        assert_eq!(extraction.products[0].name, "Only Lamp");
    }

    #[test]
    fn nothing_plausible_yields_empty_extraction() {
        let html = "<html><body><p>Hello</p></body></html>";
        assert_eq!(ProductExtractor::default().extract(html, &base()), Extraction::default());
    }

    #[test]
    fn duplicates_and_item_limit() {
        let mut html = String::new();
        html.push_str(r#"<div class="item"><a href="/p/same"><h2>Same</h2></a><i class="price">5</i></div>"#);
        html.push_str(r#"<div class="item"><a href="/p/same"><h2>Same again</h2></a><i class="price">5</i></div>"#);
        for i in 0..20 {
            html.push_str(&format!(
                r#"<div class="item"><a href="/p/{i}"><h2>Item {i}</h2></a><i class="price">{i}</i></div>"#
            ));
        }

        let config = ExtractorConfig {
            max_items: 5,
            ..ExtractorConfig::default()
        };
        let extraction = ProductExtractor::new(&config).unwrap().extract(&html, &base());

        // five containers examined, one of them a duplicate link
        assert_eq!(extraction.products.len(), 4);
        assert_eq!(extraction.products[0].name, "Same");
    }

    #[test]
    fn name_falls_back_to_link_title_and_is_truncated() {
        let long_name = "x".repeat(150);
        let html = format!(
            r#"
            <div class="product"><a href="/a" title="Anchor Title"></a><span class="price">10</span></div>
            <div class="product"><img src="/b.jpg" alt="{long_name}"><span class="price">20</span></div>
            "#
        );
        let extraction = ProductExtractor::default().extract(&html, &base());

        assert_eq!(extraction.products[0].name, "Anchor Title");
        assert_eq!(extraction.products[1].name.chars().count(), MAX_NAME_CHARS);
    }

    #[test]
    fn skips_unusable_links_and_inline_images() {
        let html = r##"
            <div class="product">
              <img src="data:image/gif;base64,R0lGOD" data-lazy-src="/real.jpg">
              <a href="#">top</a><a href="javascript:void(0)">js</a><a href="/p/ok">ok</a>
              <h2>Bag</h2><span itemprop="price" content="55.50">55,50 ₾</span>
            </div>
            <div class="product"><h2>Hat</h2><span class="price">15</span></div>
        "##;
        let extraction = ProductExtractor::default().extract(html, &base());
        let bag = &extraction.products[0];

        assert_eq!(bag.image_url.as_deref(), Some("https://shop.example.ge/real.jpg"));
        assert_eq!(bag.link_url.as_deref(), Some("https://shop.example.ge/p/ok"));
        assert_eq!(bag.price, Price::new("55.50"));
        assert_eq!(extraction.products[1].link_url, None);
    }

    #[test]
    fn anchor_container_uses_its_own_href() {
        let config = ExtractorConfig {
            container_selectors: vec!["a.card".to_string()],
            ..ExtractorConfig::default()
        };
        let html = r#"
            <a class="card" href="/p/1"><h2>One</h2><span class="price">1</span></a>
            <a class="card" href="/p/2"><h2>Two</h2><span class="price">2</span></a>
        "#;
        let extraction = ProductExtractor::new(&config).unwrap().extract(html, &base());

        assert_eq!(extraction.products[1].link_url.as_deref(), Some("https://shop.example.ge/p/2"));
    }

    #[test]
    fn invalid_container_selector_is_rejected() {
        let config = ExtractorConfig {
            container_selectors: vec!["div[".to_string()],
            ..ExtractorConfig::default()
        };
        assert!(matches!(
            ProductExtractor::new(&config),
            Err(ExtractorError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn reports_container_match_counts() {
        let counts = ProductExtractor::default().container_matches(LISTING);
        assert_eq!(counts[0], (".product".to_string(), 3));
    }
}
