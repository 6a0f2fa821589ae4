use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    pub name: String,
    pub base_url: String,
    #[serde(default)]
    pub description: String,
    pub urls: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub snapshot_file: Option<PathBuf>,
    #[serde(default)]
    pub export_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SitesConfig {
    pub sites: BTreeMap<String, SiteConfig>,
    #[serde(default, rename = "default_settings")]
    pub settings: Settings,
}

impl SitesConfig {
    /// Every configured URL across all sites, in site order.
    pub fn all_urls(&self) -> Vec<String> {
        self.sites
            .values()
            .flat_map(|site| site.urls.iter().cloned())
            .collect()
    }

    /// URLs for one site; empty when the key is not configured.
    pub fn site_urls(&self, key: &str) -> Vec<String> {
        self.sites
            .get(key)
            .map(|site| site.urls.clone())
            .unwrap_or_default()
    }

    /// Resolves the site a URL belongs to, by membership in the site's
    /// URL list or by base URL prefix.
    pub fn site_for(&self, url: &str) -> Option<(&str, &SiteConfig)> {
        self.sites
            .iter()
            .find(|(_, site)| {
                site.urls.iter().any(|u| u == url) || url.starts_with(&site.base_url)
            })
            .map(|(key, site)| (key.as_str(), site))
    }
}

pub fn load_sites_config(path: &Path) -> Result<SitesConfig> {
    if !path.exists() {
        bail!("Sites configuration file not found: {path:?}");
    }

    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read sites configuration {path:?}"))?;
    let config: SitesConfig = serde_json::from_str(&text)
        .with_context(|| format!("Sites configuration {path:?} is not valid JSON"))?;

    for (key, site) in &config.sites {
        if site.name.trim().is_empty() {
            bail!("Site '{key}' has an empty name");
        }
        if site.urls.is_empty() {
            bail!("Site '{key}' has no URLs configured");
        }
        Url::parse(&site.base_url)
            .with_context(|| format!("Site '{key}' has an invalid base URL '{}'", site.base_url))?;
        for url in &site.urls {
            Url::parse(url)
                .with_context(|| format!("Site '{key}' has an invalid URL '{url}'"))?;
        }
    }

    info!(
        action = "load",
        component = "sites_config",
        path = ?path,
        site_count = config.sites.len(),
        "Sites configuration loaded"
    );
    Ok(config)
}

pub fn print_sites(config: &SitesConfig) {
    println!("\n📋 CONFIGURED SITES:");
    println!("{}", "=".repeat(60));

    for (key, site) in &config.sites {
        println!("\n🌐 {} ({key})", site.name);
        if !site.description.is_empty() {
            println!("   Description: {}", site.description);
        }
        println!("   Base URL: {}", site.base_url);
        println!("   Pages to analyze: {}", site.urls.len());
        for url in &site.urls {
            println!("     - {url}");
        }
    }
}
