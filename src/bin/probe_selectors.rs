//! Shows how the product extractor sees a page.
//!
//! Usage: probe_selectors <URL | path/to/page.html> [base-url]

use anyhow::{bail, Context, Result};
use std::fs;
use url::Url;

use product_bot::config::Config;
use product_bot::parsers::ProductExtractor;
use product_bot::utils::http::{create_client, fetch_html, normalize_url};

#[tokio::main]
async fn main() -> Result<()> {
    let mut args = std::env::args().skip(1);
    let Some(target) = args.next() else {
        bail!("usage: probe_selectors <URL | path/to/page.html> [base-url]");
    };

    let config = Config::load()?;
    let extractor = ProductExtractor::new(&config.extractor)?;

    let (html, base_url) = if target.starts_with("http://") || target.starts_with("https://") {
        let url = normalize_url(&target)?;
        println!("Fetching {}...", url);

        let client = create_client(&config.http)?;
        let page = fetch_html(&client, &url, &config.http).await?;
        println!("Status {} after {} attempt(s), {} bytes", page.status, page.attempts, page.html.len());

        fs::write("probe_sample.html", &page.html)?;
        (page.html, page.url)
    } else {
        let html = fs::read_to_string(&target).with_context(|| format!("Failed to read {}", target))?;
        let base = args.next().unwrap_or_else(|| "http://localhost/".to_string());
        let base_url = Url::parse(&base).with_context(|| format!("Invalid base URL {}", base))?;
        (html, base_url)
    };

    println!("\nContainer selectors:");
    for (selector, count) in extractor.container_matches(&html) {
        if count > 0 {
            println!("  '{}' matched {} elements", selector, count);
        } else {
            println!("  '{}' -", selector);
        }
    }

    let extraction = extractor.extract(&html, &base_url);
    match &extraction.selector {
        Some(selector) => println!("\nUsing '{}': {} products", selector, extraction.products.len()),
        None => println!("\nNo products recognised"),
    }

    for (i, product) in extraction.products.iter().enumerate() {
        println!("{:>3}. {} | {}", i + 1, product.name, product.price);
        if let Some(link) = &product.link_url {
            println!("     link:  {}", link);
        }
        if let Some(image) = &product.image_url {
            println!("     image: {}", image);
        }
    }

    Ok(())
}
